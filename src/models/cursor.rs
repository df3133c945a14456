/// Next block a network monitor will scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub network_id: String,
    next_block: u64,
}

impl Cursor {
    pub fn new(network_id: &str, start_block: u64) -> Self {
        Self {
            network_id: network_id.to_string(),
            next_block: start_block,
        }
    }

    pub fn next_block(&self) -> u64 {
        self.next_block
    }

    /// Whether `height` has blocks this cursor has not scanned
    pub fn is_behind(&self, height: u64) -> bool {
        self.next_block <= height
    }

    /// Move past `height`. Never moves backwards.
    pub fn advance_past(&mut self, height: u64) {
        self.next_block = self.next_block.max(height.saturating_add(1));
    }
}
