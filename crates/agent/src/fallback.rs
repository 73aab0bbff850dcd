//! Deterministic rule-based command matcher.
//!
//! Used whenever the remote interpreter is unreachable or untrustworthy.
//! Rules are evaluated in fixed priority order; each is a pattern plus an
//! extractor with a fixed confidence, independently unit-testable. The
//! matcher is pure and total: every input yields some command, bottoming
//! out in a low-confidence conversational fallback.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

use tally_core::{Command, Intent, WALK_IN_CUSTOMER};

pub const GREETING_CONFIDENCE: f32 = 0.8;
pub const HELP_CONFIDENCE: f32 = 0.9;
pub const EXTRACTED_CONFIDENCE: f32 = 0.7;
pub const NO_MATCH_CONFIDENCE: f32 = 0.3;

/// Label used when a fallback-parsed expense has no "for ..." tail. The
/// executors treat a description as required; only this parser may default it.
pub const DEFAULT_EXPENSE_DESCRIPTION: &str = "Miscellaneous expense";
pub const DEFAULT_EXPENSE_CATEGORY: &str = "General";

const GREETINGS: &[&str] = &[
    "hi",
    "hello",
    "hey",
    "good morning",
    "good afternoon",
    "good evening",
    "selam",
    "hola",
];

// The gap between the keyword and the amount must not contain digits or a
// minus sign, so negative amounts fall through instead of matching.
static SALE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bsales?\b[^\d-]*(\d+(?:\.\d{1,2})?)\b(?:\s+for\s+(.+?))?\s*$")
        .expect("sale pattern is a build-time constant")
});

static EXPENSE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bexpenses?\b[^\d-]*(\d+(?:\.\d{1,2})?)\b(?:\s+(?:for|on)\s+(.+?))?\s*$")
        .expect("expense pattern is a build-time constant")
});

static CUSTOMER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:add|new|create|register)\s+customer\s+(.+?)\s*$")
        .expect("customer pattern is a build-time constant")
});

static HELP_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bhelp\b|\bcommands\b|what can you do")
        .expect("help pattern is a build-time constant")
});

type Rule = fn(&str) -> Option<Command>;

const RULES: &[Rule] = &[match_greeting, match_help, match_sale, match_expense, match_customer];

/// Map raw operator text to a command. Never fails and never panics.
pub fn match_text(text: &str) -> Command {
    for rule in RULES {
        if let Some(command) = rule(text) {
            return command;
        }
    }
    no_match()
}

fn match_greeting(text: &str) -> Option<Command> {
    let normalized = normalize(text);
    GREETINGS.contains(&normalized.as_str()).then(|| {
        Command::conversation(
            "Hello! The smart assistant is offline right now, but I can still record \
             sales, expenses, and customers from plain commands.",
            GREETING_CONFIDENCE,
        )
    })
}

fn match_help(text: &str) -> Option<Command> {
    HELP_PATTERN.is_match(text).then(|| {
        Command::conversation(
            "The smart assistant is offline right now, but I can still record:\n\
             - \"Record sales of 5000 for John\"\n\
             - \"Add expense of 200 for supplies\"\n\
             - \"Add customer Abebe Traders\"\n\
             Inventory tracking needs the smart assistant back online.",
            HELP_CONFIDENCE,
        )
    })
}

fn match_sale(text: &str) -> Option<Command> {
    let captures = SALE_PATTERN.captures(text)?;
    let amount = parse_amount(captures.get(1)?.as_str())?;

    let mut command = Command::with_intent(Intent::Sale, EXTRACTED_CONFIDENCE);
    command.amount = Some(amount);
    command.counterparty_name = Some(
        captures
            .get(2)
            .map(|name| clean_tail(name.as_str()))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| WALK_IN_CUSTOMER.to_string()),
    );
    Some(command)
}

fn match_expense(text: &str) -> Option<Command> {
    let captures = EXPENSE_PATTERN.captures(text)?;
    let amount = parse_amount(captures.get(1)?.as_str())?;

    let mut command = Command::with_intent(Intent::Expense, EXTRACTED_CONFIDENCE);
    command.amount = Some(amount);
    command.description = Some(
        captures
            .get(2)
            .map(|description| clean_tail(description.as_str()))
            .filter(|description| !description.is_empty())
            .unwrap_or_else(|| DEFAULT_EXPENSE_DESCRIPTION.to_string()),
    );
    command.category = Some(DEFAULT_EXPENSE_CATEGORY.to_string());
    Some(command)
}

fn match_customer(text: &str) -> Option<Command> {
    let captures = CUSTOMER_PATTERN.captures(text)?;
    let name = clean_tail(captures.get(1)?.as_str());
    if name.is_empty() {
        return None;
    }

    let mut command = Command::with_intent(Intent::Customer, EXTRACTED_CONFIDENCE);
    command.counterparty_name = Some(name);
    Some(command)
}

// Every reply built here discloses offline mode: this parser only runs
// when the remote interpreter is unavailable.
fn no_match() -> Command {
    Command::conversation(
        "The smart assistant is offline and I didn't recognize that as a command. \
         Say \"help\" to see what I can still record.",
        NO_MATCH_CONFIDENCE,
    )
}

fn normalize(text: &str) -> String {
    text.trim().trim_end_matches(['!', '.', ',', '?']).trim().to_ascii_lowercase()
}

fn clean_tail(tail: &str) -> String {
    tail.trim().trim_end_matches(['!', '.']).trim().to_string()
}

fn parse_amount(raw: &str) -> Option<Decimal> {
    let amount: Decimal = raw.parse().ok()?;
    (amount > Decimal::ZERO).then_some(amount)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use tally_core::{Intent, WALK_IN_CUSTOMER};

    use super::{
        match_text, DEFAULT_EXPENSE_DESCRIPTION, EXTRACTED_CONFIDENCE, GREETING_CONFIDENCE,
        HELP_CONFIDENCE, NO_MATCH_CONFIDENCE,
    };

    #[test]
    fn greetings_are_conversational_and_disclose_offline_mode() {
        for greeting in ["hi", "Hello!", "good morning", "Selam"] {
            let command = match_text(greeting);
            assert_eq!(command.intent, Intent::Conversation, "{greeting}");
            assert_eq!(command.confidence, GREETING_CONFIDENCE);
            let reply = command.conversational_reply.expect("greeting reply");
            assert!(reply.contains("offline"), "{greeting} must disclose degraded mode");
        }
    }

    #[test]
    fn help_requests_enumerate_supported_commands() {
        for ask in ["help", "what can you do?", "show me the commands"] {
            let command = match_text(ask);
            assert_eq!(command.intent, Intent::Conversation, "{ask}");
            assert_eq!(command.confidence, HELP_CONFIDENCE);
            let reply = command.conversational_reply.expect("help reply");
            assert!(reply.contains("sales") && reply.contains("expense"), "{ask}");
            assert!(reply.contains("offline"), "{ask} must disclose degraded mode");
        }
    }

    #[test]
    fn sale_with_counterparty_extracts_amount_and_name() {
        let command = match_text("Record sales of 5000 for John");
        assert_eq!(command.intent, Intent::Sale);
        assert_eq!(command.amount, Some(Decimal::from(5000)));
        assert_eq!(command.counterparty_name.as_deref(), Some("John"));
        assert_eq!(command.confidence, EXTRACTED_CONFIDENCE);
    }

    #[test]
    fn sale_without_counterparty_uses_walk_in_sentinel() {
        let command = match_text("sales of 120.50");
        assert_eq!(command.intent, Intent::Sale);
        assert_eq!(command.amount, Some(Decimal::new(12050, 2)));
        assert_eq!(command.counterparty_name.as_deref(), Some(WALK_IN_CUSTOMER));
    }

    #[test]
    fn sale_accepts_a_currency_token_before_the_amount() {
        let command = match_text("record sales of ETB 300 for Hana");
        assert_eq!(command.intent, Intent::Sale);
        assert_eq!(command.amount, Some(Decimal::from(300)));
        assert_eq!(command.counterparty_name.as_deref(), Some("Hana"));
    }

    #[test]
    fn expense_with_description_keeps_general_category() {
        let command = match_text("Add expense of 200 for supplies");
        assert_eq!(command.intent, Intent::Expense);
        assert_eq!(command.amount, Some(Decimal::from(200)));
        assert_eq!(command.description.as_deref(), Some("supplies"));
        assert_eq!(command.category.as_deref(), Some("General"));
    }

    #[test]
    fn expense_without_tail_gets_the_default_label() {
        let command = match_text("expense 75.25");
        assert_eq!(command.intent, Intent::Expense);
        assert_eq!(command.description.as_deref(), Some(DEFAULT_EXPENSE_DESCRIPTION));
    }

    #[test]
    fn customer_rule_extracts_the_full_name() {
        let command = match_text("add customer Abebe Traders");
        assert_eq!(command.intent, Intent::Customer);
        assert_eq!(command.counterparty_name.as_deref(), Some("Abebe Traders"));
        assert_eq!(command.confidence, EXTRACTED_CONFIDENCE);
    }

    #[test]
    fn negative_amounts_fall_through_without_panicking() {
        let command = match_text("record sales of -500 for John");
        assert_eq!(command.intent, Intent::Conversation);
        assert_eq!(command.confidence, NO_MATCH_CONFIDENCE);
    }

    #[test]
    fn over_precise_amounts_do_not_match() {
        let command = match_text("sales of 10.123");
        assert_eq!(command.intent, Intent::Conversation);
    }

    #[test]
    fn unmatched_text_is_a_low_confidence_conversation_that_discloses_offline_mode() {
        let command = match_text("the weather is nice today");
        assert_eq!(command.intent, Intent::Conversation);
        assert_eq!(command.confidence, NO_MATCH_CONFIDENCE);
        let reply = command.conversational_reply.expect("no-match reply");
        assert!(reply.contains("offline"), "no-match reply must disclose degraded mode");
    }

    #[test]
    fn rules_never_create_amount_bearing_commands_from_greetings() {
        for text in ["hi", "hello", "help", "what can you do"] {
            let command = match_text(text);
            assert!(command.amount.is_none(), "{text} must not carry an amount");
            assert_eq!(command.intent, Intent::Conversation);
        }
    }
}
