/// Milliseconds since the Unix epoch. Used for room-list ordering on the
/// wire; idle expiry uses monotonic `Instant`s instead.
pub fn unix_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
