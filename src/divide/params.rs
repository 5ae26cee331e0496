use crate::models::Task;

/// Number of subtasks to request for one task, always within `MIN..=MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubtaskCount(u8);

impl SubtaskCount {
    pub const MIN: u8 = 2;
    pub const MAX: u8 = 5;
    pub const DEFAULT: u8 = 3;

    /// Clamp any integer into range.
    pub fn new(n: i64) -> Self {
        Self(n.clamp(Self::MIN as i64, Self::MAX as i64) as u8)
    }

    /// Parse free-text input the way a number field does: leading integer
    /// prefix, clamped; no digits at all yields the default.
    pub fn parse_input(input: &str) -> Self {
        let s = input.trim_start();
        let (sign, rest) = match s.as_bytes().first() {
            Some(b'-') => (-1, &s[1..]),
            Some(b'+') => (1, &s[1..]),
            _ => (1, s),
        };
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return Self::default();
        }
        // Overlong digit strings saturate to the upper bound.
        let value = digits.parse::<i64>().unwrap_or(i64::MAX);
        Self::new(sign * value)
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for SubtaskCount {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl std::fmt::Display for SubtaskCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-task division request parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DivisionParams {
    pub subtasks: SubtaskCount,
    pub context: String,
}

impl DivisionParams {
    pub fn new(subtasks: SubtaskCount, context: impl Into<String>) -> Self {
        Self {
            subtasks,
            context: context.into(),
        }
    }
}

/// A task waiting in the divide queue with its request parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedTask {
    pub task: Task,
    pub params: DivisionParams,
}

impl QueuedTask {
    pub fn new(task: Task) -> Self {
        Self {
            task,
            params: DivisionParams::default(),
        }
    }

    pub fn with_params(task: Task, params: DivisionParams) -> Self {
        Self { task, params }
    }
}
