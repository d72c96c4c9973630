//! # Example Generator
//!
//! Training pairs of (chat header text, contact name). Each variant starts
//! from a short hand-written list and appends synthetic examples whose names
//! are drawn from fixed first-name and surname pools.

use crate::config::{Variant, VariantConfig};

/// A single training pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Example {
    /// Raw screen text the model reads.
    pub text: String,
    /// Contact name the model should emit.
    pub label: String,
}

impl Example {
    pub fn new(text: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            label: label.into(),
        }
    }
}

/// Source of uniform random indices.
pub trait RandomSource {
    /// Returns a value uniformly drawn from `0..n`. `n` is never zero.
    fn below(&mut self, n: usize) -> usize;

    /// Pick one element of a non-empty slice.
    fn choose<'a, T>(&mut self, items: &'a [T]) -> &'a T
    where
        Self: Sized,
    {
        &items[self.below(items.len())]
    }
}

impl RandomSource for oorandom::Rand32 {
    fn below(&mut self, n: usize) -> usize {
        self.rand_range(0..n as u32) as usize
    }
}

const FULL_FIXED: &[(&str, &str)] = &[
    ("John Smith\nOnline\nLast seen today at 2:30 PM", "John Smith"),
    ("Maria Garcia\nTyping...\nLast seen yesterday", "Maria Garcia"),
    ("Dr. Johnson\nOnline\nLast seen 5 minutes ago", "Dr. Johnson"),
    ("Sarah Wilson\nLast seen today at 10:15 AM", "Sarah Wilson"),
    ("Mike Chen\nOnline\nLast seen 1 hour ago", "Mike Chen"),
    ("Anna Rodriguez\nLast seen yesterday at 8:45 PM", "Anna Rodriguez"),
    ("Prof. Brown\nOnline\nLast seen 30 minutes ago", "Prof. Brown"),
    ("Lisa Johnson\nTyping...\nLast seen today", "Lisa Johnson"),
    ("David Kim\nLast seen 2 hours ago", "David Kim"),
    ("Emma Davis\nOnline\nLast seen 15 minutes ago", "Emma Davis"),
];

const SMALL_FIXED: &[(&str, &str)] = &[
    ("John Smith\nOnline\nLast seen today", "John Smith"),
    ("Maria Garcia\nTyping...\nLast seen yesterday", "Maria Garcia"),
    ("Dr. Johnson\nOnline\nLast seen 5 minutes ago", "Dr. Johnson"),
    ("Sarah Wilson\nLast seen today", "Sarah Wilson"),
    ("Mike Chen\nOnline\nLast seen 1 hour ago", "Mike Chen"),
    ("Anna Rodriguez\nLast seen yesterday", "Anna Rodriguez"),
    ("Prof. Brown\nOnline\nLast seen 30 minutes ago", "Prof. Brown"),
    ("Lisa Johnson\nTyping...\nLast seen today", "Lisa Johnson"),
    ("David Kim\nLast seen 2 hours ago", "David Kim"),
    ("Emma Davis\nOnline\nLast seen 15 minutes ago", "Emma Davis"),
];

const TINY_FIXED: &[(&str, &str)] = &[
    ("John Smith\nOnline", "John Smith"),
    ("Maria Garcia\nTyping", "Maria Garcia"),
    ("Dr. Johnson\nOnline", "Dr. Johnson"),
    ("Sarah Wilson\nLast seen", "Sarah Wilson"),
    ("Mike Chen\nOnline", "Mike Chen"),
];

const FIRST_NAMES: &[&str] = &[
    "Alex", "Chris", "Taylor", "Jordan", "Casey", "Morgan", "Riley", "Avery", "Quinn", "Blake",
];

const SURNAMES: &[&str] = &[
    "Anderson", "Taylor", "Thomas", "Jackson", "White", "Harris", "Martin", "Thompson", "Garcia",
    "Martinez",
];

const STATUSES: &[&str] = &["Online", "Last seen today", "Last seen yesterday", "Typing..."];

/// Shape of the text wrapped around a synthetic name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusTemplate {
    /// Random status plus a random afternoon clock time.
    StatusWithClock,
    /// Random status plus a static "Last seen today" line.
    Status,
    /// Static "Online" line.
    Online,
}

impl StatusTemplate {
    fn render<R: RandomSource>(self, name: &str, rng: &mut R) -> String {
        match self {
            Self::StatusWithClock => {
                let status = rng.choose(STATUSES);
                let hour = 1 + rng.below(11);
                let minute = 10 + rng.below(50);
                format!("{name}\n{status}\nLast seen today at {hour}:{minute:02} PM")
            }
            Self::Status => {
                let status = rng.choose(STATUSES);
                format!("{name}\n{status}\nLast seen today")
            }
            Self::Online => format!("{name}\nOnline"),
        }
    }
}

/// Produces the ordered example list for one variant.
#[derive(Debug, Clone)]
pub struct ExampleGenerator {
    fixed: &'static [(&'static str, &'static str)],
    first_names: &'static [&'static str],
    surnames: &'static [&'static str],
    template: StatusTemplate,
    synthetic: usize,
}

impl ExampleGenerator {
    /// Generator for a preset, with its default synthetic count.
    pub fn for_variant(variant: Variant) -> Self {
        Self::from_config(&variant.config())
    }

    /// Generator for a configuration; the variant picks the pools and
    /// template, the configuration picks the synthetic count.
    pub fn from_config(config: &VariantConfig) -> Self {
        let (fixed, pool, template) = match config.variant {
            Variant::Full => (FULL_FIXED, 10, StatusTemplate::StatusWithClock),
            Variant::Small => (SMALL_FIXED, 10, StatusTemplate::Status),
            Variant::Tiny => (TINY_FIXED, 5, StatusTemplate::Online),
        };
        Self {
            fixed,
            first_names: &FIRST_NAMES[..pool],
            surnames: &SURNAMES[..pool],
            template,
            synthetic: config.synthetic_examples,
        }
    }

    /// Total number of examples [`generate`](Self::generate) returns.
    pub fn len(&self) -> usize {
        self.fixed.len() + self.synthetic
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The hand-written list followed by the synthetic examples.
    pub fn generate<R: RandomSource>(&self, rng: &mut R) -> Vec<Example> {
        let mut examples = Vec::with_capacity(self.len());
        examples.extend(self.fixed.iter().map(|&(text, label)| Example::new(text, label)));

        for _ in 0..self.synthetic {
            let first = rng.choose(self.first_names);
            let last = rng.choose(self.surnames);
            let name = format!("{first} {last}");
            let text = self.template.render(&name, rng);
            examples.push(Example::new(text, name));
        }

        tracing::debug!(count = examples.len(), "generated training examples");
        examples
    }
}
