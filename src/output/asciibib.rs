//! Line-oriented plain text bibliography (`key:: value`).

use std::fmt::Write;

use crate::models::{CommentPeriod, NistItem, PersonName};

struct Lines {
    prefix: String,
    out: String,
}

impl Lines {
    fn new(prefix: &str) -> Self {
        let prefix = if prefix.is_empty() {
            String::new()
        } else {
            format!("{}.", prefix)
        };
        Self {
            prefix,
            out: String::new(),
        }
    }

    fn put(&mut self, key: &str, value: &str) {
        let _ = writeln!(self.out, "{}{}:: {}", self.prefix, key, value);
    }

    fn put_opt(&mut self, key: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.put(key, value);
        }
    }

    /// Group header for repeated entries
    fn header(&mut self, key: &str, count: usize) {
        if count > 1 {
            let _ = writeln!(self.out, "{}{}::", self.prefix, key);
        }
    }
}

/// Render `item` as asciibib.
///
/// An empty `prefix` produces a standalone entry with its `[%bibitem]`
/// heading; otherwise every key is prefixed with `prefix.`.
pub fn to_asciibib(item: &NistItem, prefix: &str) -> String {
    let mut lines = Lines::new(prefix);
    if prefix.is_empty() {
        lines.out.push_str("[%bibitem]\n== {blank}\n");
    }

    lines.put_opt("id", item.ref_anchor().as_deref());
    if let Some(fetched) = item.fetched {
        lines.put("fetched", &fetched.to_string());
    }
    for title in &item.title {
        lines.header("title", item.title.len());
        lines.put_opt("title.type", title.kind.as_deref());
        lines.put("title.content", &title.content);
        lines.put_opt("title.language", title.language.as_deref());
        lines.put_opt("title.script", title.script.as_deref());
    }
    lines.put_opt("type", item.item_type.as_deref());
    for id in &item.docidentifier {
        lines.header("docid", item.docidentifier.len());
        lines.put("docid.type", &id.kind);
        if id.primary == Some(true) {
            lines.put("docid.primary", "true");
        }
        lines.put("docid.id", &id.id);
    }
    for date in &item.date {
        lines.header("date", item.date.len());
        lines.put("date.type", date.kind.as_str());
        lines.put("date.value", &date.value);
    }
    for contributor in &item.contributor {
        lines.header("contributor", item.contributor.len());
        if let Some(org) = &contributor.organization {
            lines.put("contributor.organization.name", &org.name);
            lines.put_opt("contributor.organization.abbreviation", org.abbreviation.as_deref());
            lines.put_opt("contributor.organization.uri", org.uri.as_deref());
        }
        if let Some(person) = &contributor.person {
            put_name(&mut lines, &person.name);
            for affiliation in &person.affiliation {
                lines.put(
                    "contributor.person.affiliation.organization.name",
                    &affiliation.organization.name,
                );
            }
        }
        for role in &contributor.role {
            lines.put("contributor.role.type", &role.kind);
        }
    }
    lines.put_opt("edition.content", item.edition.as_deref());
    for language in &item.language {
        lines.put("language", language);
    }
    for script in &item.script {
        lines.put("script", script);
    }
    for abstract_text in &item.abstract_text {
        lines.put("abstract.content", &abstract_text.content);
        lines.put_opt("abstract.language", abstract_text.language.as_deref());
        lines.put_opt("abstract.script", abstract_text.script.as_deref());
    }
    if let Some(status) = &item.docstatus {
        lines.put("docstatus.stage", &status.stage);
        lines.put_opt("docstatus.substage", status.substage.as_deref());
        lines.put_opt("docstatus.iteration", status.iteration.as_deref());
    }
    for link in &item.link {
        lines.header("link", item.link.len());
        lines.put("link.type", &link.kind);
        lines.put("link.content", &link.content);
    }
    for relation in &item.relation {
        lines.header("relation", item.relation.len());
        lines.put("relation.type", &relation.kind);
        lines.put("relation.bibitem.formattedref.content", &relation.bibitem.formattedref);
    }
    for series in &item.series {
        lines.header("series", item.series.len());
        lines.put_opt("series.type", series.kind.as_deref());
        lines.put("series.title", &series.title);
        lines.put_opt("series.abbreviation", series.abbreviation.as_deref());
        lines.put_opt("series.number", series.number.as_deref());
    }
    for keyword in &item.keyword {
        lines.put("keyword", keyword);
    }
    lines.put_opt("doctype", item.ext.doctype.as_deref());
    if let Some(period) = &item.ext.commentperiod {
        put_comment_period(&mut lines, period);
    }

    lines.out
}

fn put_name(lines: &mut Lines, name: &PersonName) {
    if let Some(complete) = &name.completename {
        lines.put("contributor.person.name.completename", complete);
        return;
    }
    for forename in &name.forename {
        lines.put("contributor.person.name.forename", forename);
    }
    lines.put_opt("contributor.person.name.surname", name.surname.as_deref());
    for addition in &name.addition {
        lines.put("contributor.person.name.addition", addition);
    }
}

fn put_comment_period(lines: &mut Lines, period: &CommentPeriod) {
    lines.put("commentperiod.from", &period.from.to_string());
    if let Some(to) = period.to {
        lines.put("commentperiod.to", &to.to_string());
    }
    if let Some(extended) = period.extended {
        lines.put("commentperiod.extended", &extended.to_string());
    }
}
