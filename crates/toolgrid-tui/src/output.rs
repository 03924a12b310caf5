use std::collections::VecDeque;

use toolgrid_core::exec::OutputLine;

use crate::text::sanitize_for_display;

/// The most recent output lines of one execution, oldest evicted first.
///
/// Owned by the dashboard task; the producer hands lines over through the
/// channel, so no locking is involved. Once sealed (the sentinel arrived)
/// further pushes are refused.
#[derive(Debug, Clone)]
pub struct OutputBuffer {
    lines: VecDeque<OutputLine>,
    capacity: usize,
    sealed: bool,
}

impl OutputBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
            sealed: false,
        }
    }

    /// Appends a sanitized copy of `line`. Returns `false` if sealed.
    pub fn push(&mut self, line: OutputLine) -> bool {
        if self.sealed {
            tracing::warn!("output line after completion dropped");
            return false;
        }
        let text = sanitize_for_display(&line.text).into_owned();
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(OutputLine { text, ..line });
        true
    }

    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> impl ExactSizeIterator<Item = &OutputLine> {
        self.lines.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eviction_keeps_latest_in_order() {
        let height = 4;
        let mut buffer = OutputBuffer::new(height);
        for i in 0..height + 5 {
            assert!(buffer.push(OutputLine::output(format!("line {i}"))));
        }
        let texts: Vec<_> = buffer.lines().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, ["line 5", "line 6", "line 7", "line 8"]);
    }

    #[test]
    fn test_sealed_buffer_refuses_lines() {
        let mut buffer = OutputBuffer::new(3);
        buffer.push(OutputLine::output("last"));
        buffer.seal();
        assert!(!buffer.push(OutputLine::output("late")));
        assert_eq!(buffer.len(), 1);
        assert!(buffer.is_sealed());
    }

    #[test]
    fn test_push_sanitizes_and_keeps_kind() {
        let mut buffer = OutputBuffer::new(2);
        buffer.push(OutputLine::error("a\tb\r\n"));
        let line = buffer.lines().next().unwrap();
        assert_eq!(line.text, "a    b");
        assert_eq!(line.kind, toolgrid_core::exec::LineKind::Error);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut buffer = OutputBuffer::new(0);
        assert_eq!(buffer.capacity(), 1);
        buffer.push(OutputLine::output("a"));
        buffer.push(OutputLine::output("b"));
        assert_eq!(buffer.lines().next().unwrap().text, "b");
    }
}
