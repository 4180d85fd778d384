//! Hook injector: splices tracking statements into the lifecycle hook blocks
//! of an existing declaration, working on raw text so the rest of the
//! declaration is reproduced byte for byte.
//!
//! Applying the injector twice to the same text inserts the statements
//! twice; callers run it once per generated build.

use crate::error::{InjectError, LocateError};
use crate::locate::{locate_sub_block, BraceScan, Span};
use crate::policy::{Naming, Policy};
use once_cell::sync::Lazy;
use regex::Regex;

static DEFINITION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\w+)\s*=\s*\{").unwrap());

/// The two statements that add the current instance to `list` on build.
pub fn track_statements(list: &str, naming: &Naming) -> [String; 2] {
    [
        format!(
            "location = {{ add_to_variable_list = {{ name = {} target = prev }} }}",
            list
        ),
        format!("{} = yes", naming.built_effect()),
    ]
}

/// The two statements that remove the current instance from `list` on destroy.
pub fn untrack_statements(list: &str, naming: &Naming) -> [String; 2] {
    [
        format!(
            "location = {{ remove_list_variable = {{ name = {} target = prev }} }}",
            list
        ),
        format!("{} = yes", naming.destroyed_effect()),
    ]
}

fn snippet(comment: &str, statements: [String; 2], naming: &Naming) -> String {
    let [first, second] = statements;
    format!(
        "\n\t\t# {}: {}\n\t\t{}\n\t\t{}",
        naming.banner(),
        comment,
        first,
        second
    )
}

/// Prefix every inline template identifier directly inside the inline
/// container, except preserved keys and the container key itself.
pub fn rename_inline_definitions(raw: &str, policy: &Policy) -> String {
    let container = &policy.keys.inline;
    let Some(span) = locate_sub_block(raw, container) else {
        return raw.to_owned();
    };
    let block = span.slice(raw);
    let scan = BraceScan::new(block);
    let mut renamed = String::with_capacity(block.len() + 64);
    let mut last = 0;
    for caps in DEFINITION.captures_iter(block) {
        let Some(name) = caps.get(1) else { continue };
        if scan.is_masked(name.start()) || scan.depth_at(name.start()) != 1 {
            continue;
        }
        let ident = name.as_str();
        if ident == container || policy.inject.preserved.contains(ident) {
            continue;
        }
        tracing::debug!(ident, "renaming inline definition");
        renamed.push_str(&block[last..name.start()]);
        renamed.push_str(&policy.naming.renamed(ident));
        last = name.end();
    }
    renamed.push_str(&block[last..]);
    format!("{}{}{}", &raw[..span.start], renamed, &raw[span.end..])
}

fn splice_before_close(text: &str, span: Span, snippet: &str) -> String {
    let close = span.close();
    format!("{}{}\n\t{}", &text[..close], snippet, &text[close..])
}

fn append_sub_block(
    subject: &str,
    text: &str,
    key: &str,
    snippet: &str,
) -> Result<String, LocateError> {
    let last = text.rfind('}').ok_or_else(|| LocateError::Unterminated {
        name: subject.to_owned(),
    })?;
    Ok(format!(
        "{}\n\t{} = {{{}\n\t}}\n{}",
        &text[..last],
        key,
        snippet,
        &text[last..]
    ))
}

/// Patch the raw declaration of `subject` so its pre-build hook adds the
/// instance to `list` and its post-destroy hook removes it.
///
/// The declaration must already contain at least one hook block; a missing
/// one is synthesized before the declaration's closing brace.
pub fn inject_hooks(
    subject: &str,
    raw: &str,
    list: &str,
    policy: &Policy,
) -> Result<String, InjectError> {
    let keys = &policy.keys;
    let naming = &policy.naming;
    if locate_sub_block(raw, &keys.pre_build).is_none()
        && locate_sub_block(raw, &keys.post_destroy).is_none()
    {
        return Err(InjectError::NoHooks {
            subject: subject.to_owned(),
        });
    }

    let text = rename_inline_definitions(raw, policy);

    let track = snippet(
        "Track building for maintenance",
        track_statements(list, naming),
        naming,
    );
    let text = match locate_sub_block(&text, &keys.pre_build) {
        Some(span) => splice_before_close(&text, span, &track),
        None => append_sub_block(subject, &text, &keys.pre_build, &track)?,
    };

    let untrack = snippet("Untrack building", untrack_statements(list, naming), naming);
    let text = match locate_sub_block(&text, &keys.post_destroy) {
        Some(span) => splice_before_close(&text, span, &untrack),
        None => append_sub_block(subject, &text, &keys.post_destroy, &untrack)?,
    };

    tracing::debug!(subject, list, "injected hooks");
    Ok(text)
}
