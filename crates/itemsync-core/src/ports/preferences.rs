//! PreferenceSource port - user settings that seed new jobs.

/// Read-only view of offline sync preferences and connection state.
pub trait PreferenceSource: Send + Sync {
    /// Global offline sync switch.
    fn offline_enabled(&self) -> bool;

    /// Only sync over unmetered networks.
    fn wifi_only(&self) -> bool;

    /// The current connection satisfies the sync requirements.
    fn current_connection_enabled(&self) -> bool;

    fn readability_enabled(&self) -> bool;

    fn article_enabled(&self) -> bool;

    fn comments_enabled(&self) -> bool;

    fn notification_enabled(&self) -> bool;
}
