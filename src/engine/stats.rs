/// Counters for one engine run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Iterations of the poll loop
    pub polls: u64,
    /// Local clipboard values written to the output channel
    pub frames_sent: u64,
    /// Peer values placed on the local clipboard
    pub frames_received: u64,
    /// Polls that skipped a value because it was the other direction's last value
    pub echoes_suppressed: u64,
    /// Clipboard writes that failed and were dropped
    pub clipboard_errors: u64,
    /// Channel I/O errors that skipped part of an iteration
    pub channel_errors: u64,
    /// Input channel remaps
    pub remaps: u64,
}
