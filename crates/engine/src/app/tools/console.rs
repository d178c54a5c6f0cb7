use std::collections::VecDeque;

const CONSOLE_PROMPT_PREFIX: &str = "> ";

pub(crate) const MAX_HISTORY_LINES: usize = 64;
pub(crate) const MAX_OUTPUT_LINES: usize = 256;
pub(crate) const MAX_PENDING_LINES: usize = 64;
pub(crate) const MAX_LINE_CHARS: usize = 256;

/// Line-oriented console buffers. Lines come from a script or stdin instead of key events.
#[derive(Debug, Default)]
pub(crate) struct ConsoleState {
    history: VecDeque<String>,
    output_lines: VecDeque<String>,
    pending_lines: VecDeque<String>,
    echo_input: bool,
}

impl ConsoleState {
    pub(crate) fn with_echo_input(mut self, echo_input: bool) -> Self {
        self.echo_input = echo_input;
        self
    }

    pub(crate) fn submit_line(&mut self, raw_line: &str) {
        let line = sanitize_line(raw_line);
        push_bounded(&mut self.history, line.clone(), MAX_HISTORY_LINES);
        if self.echo_input {
            push_bounded(
                &mut self.output_lines,
                format!("{CONSOLE_PROMPT_PREFIX}{line}"),
                MAX_OUTPUT_LINES,
            );
        }
        push_bounded(&mut self.pending_lines, line, MAX_PENDING_LINES);
    }

    pub(crate) fn append_output_line(&mut self, line: impl Into<String>) {
        push_bounded(&mut self.output_lines, line.into(), MAX_OUTPUT_LINES);
    }

    pub(crate) fn clear_output_lines(&mut self) {
        self.output_lines.clear();
    }

    #[allow(dead_code)]
    pub(crate) fn output_lines(&self) -> impl Iterator<Item = &str> {
        self.output_lines.iter().map(String::as_str)
    }

    pub(crate) fn drain_output_lines_into(&mut self, out: &mut Vec<String>) {
        out.extend(self.output_lines.drain(..));
    }

    pub(crate) fn drain_pending_lines_into(&mut self, out: &mut Vec<String>) {
        out.extend(self.pending_lines.drain(..));
    }

    #[cfg(test)]
    pub(crate) fn push_pending_line_for_test(&mut self, line: &str) {
        push_bounded(&mut self.pending_lines, line.to_string(), MAX_PENDING_LINES);
    }
}

fn sanitize_line(raw_line: &str) -> String {
    raw_line
        .chars()
        .filter(|ch| !ch.is_control())
        .take(MAX_LINE_CHARS)
        .collect()
}

fn push_bounded(queue: &mut VecDeque<String>, value: String, max_len: usize) {
    if queue.len() == max_len {
        queue.pop_front();
    }
    queue.push_back(value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_echoes_and_enqueues_raw_line() {
        let mut console = ConsoleState::default().with_echo_input(true);
        console.submit_line("test");

        assert_eq!(console.history.back().map(String::as_str), Some("test"));
        assert_eq!(
            console.output_lines.back().map(String::as_str),
            Some("> test")
        );
        assert_eq!(
            console.pending_lines.back().map(String::as_str),
            Some("test")
        );
    }

    #[test]
    fn submit_without_echo_only_enqueues() {
        let mut console = ConsoleState::default();
        console.submit_line("tick 3");
        assert!(console.output_lines.is_empty());
        assert_eq!(console.pending_lines.len(), 1);
    }

    #[test]
    fn control_characters_are_stripped_and_length_capped() {
        let mut console = ConsoleState::default();
        console.submit_line("a\tb\r");
        let over_limit = "x".repeat(MAX_LINE_CHARS + 20);
        console.submit_line(&over_limit);

        let mut drained = Vec::new();
        console.drain_pending_lines_into(&mut drained);
        assert_eq!(drained[0], "ab");
        assert_eq!(drained[1].chars().count(), MAX_LINE_CHARS);
    }

    #[test]
    fn bounded_buffers_drop_oldest_entries() {
        let mut console = ConsoleState::default();
        for idx in 0..(MAX_HISTORY_LINES + 2) {
            console.submit_line(&format!("h{idx}"));
        }
        assert_eq!(console.history.len(), MAX_HISTORY_LINES);
        assert_eq!(console.history.front().map(String::as_str), Some("h2"));

        for idx in 0..(MAX_OUTPUT_LINES + 2) {
            console.append_output_line(format!("o{idx}"));
        }
        assert_eq!(console.output_lines.len(), MAX_OUTPUT_LINES);
        assert_eq!(console.output_lines.front().map(String::as_str), Some("o2"));

        assert_eq!(console.pending_lines.len(), MAX_PENDING_LINES);
    }

    #[test]
    fn drains_empty_their_queues() {
        let mut console = ConsoleState::default().with_echo_input(true);
        console.submit_line("one");
        console.submit_line("two");

        let mut drained = Vec::new();
        console.drain_pending_lines_into(&mut drained);
        assert_eq!(drained, vec!["one".to_string(), "two".to_string()]);
        assert!(console.pending_lines.is_empty());

        let mut output = Vec::new();
        console.drain_output_lines_into(&mut output);
        assert_eq!(output, vec!["> one".to_string(), "> two".to_string()]);
        assert_eq!(console.output_lines().count(), 0);
    }
}
