//! XML rendering of an item as `bibitem` or `bibdata`.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::OutputError;
use crate::models::{CommentPeriod, Contributor, NistItem, Organization};

/// Rendering switches for [`to_xml`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct XmlOptions {
    /// Use a `bibdata` root and append the `ext` block
    pub bibdata: bool,
}

struct XmlOut {
    writer: Writer<Vec<u8>>,
}

impl XmlOut {
    fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), OutputError> {
        let elem = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.writer.write_event(Event::Start(elem))?;
        Ok(())
    }

    fn end(&mut self, name: &str) -> Result<(), OutputError> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), OutputError> {
        let elem = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.writer.write_event(Event::Empty(elem))?;
        Ok(())
    }

    fn text(&mut self, name: &str, attrs: &[(&str, &str)], text: &str) -> Result<(), OutputError> {
        self.start(name, attrs)?;
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    fn opt_text(&mut self, name: &str, text: Option<&str>) -> Result<(), OutputError> {
        match text {
            Some(text) => self.text(name, &[], text),
            None => Ok(()),
        }
    }
}

/// Render `item` as XML
pub fn to_xml(item: &NistItem, options: XmlOptions) -> Result<String, OutputError> {
    let mut out = XmlOut {
        writer: Writer::new_with_indent(Vec::new(), b' ', 2),
    };
    let root = if options.bibdata { "bibdata" } else { "bibitem" };

    let anchor = item.ref_anchor();
    let mut attrs = Vec::new();
    if let Some(anchor) = anchor.as_deref() {
        attrs.push(("id", anchor));
    }
    if let Some(kind) = item.item_type.as_deref() {
        attrs.push(("type", kind));
    }
    out.start(root, &attrs)?;

    if let Some(fetched) = item.fetched {
        out.text("fetched", &[], &fetched.to_string())?;
    }
    for title in &item.title {
        let mut attrs = vec![("format", "text/plain")];
        if let Some(kind) = title.kind.as_deref() {
            attrs.insert(0, ("type", kind));
        }
        if let Some(language) = title.language.as_deref() {
            attrs.push(("language", language));
        }
        if let Some(script) = title.script.as_deref() {
            attrs.push(("script", script));
        }
        out.text("title", &attrs, &title.content)?;
    }
    for link in &item.link {
        out.text("uri", &[("type", link.kind.as_str())], &link.content)?;
    }
    for id in &item.docidentifier {
        let mut attrs = vec![("type", id.kind.as_str())];
        if id.primary == Some(true) {
            attrs.push(("primary", "true"));
        }
        out.text("docidentifier", &attrs, &id.id)?;
    }
    for date in &item.date {
        out.start("date", &[("type", date.kind.as_str())])?;
        out.text("on", &[], &date.value)?;
        out.end("date")?;
    }
    for contributor in &item.contributor {
        write_contributor(&mut out, contributor)?;
    }
    out.opt_text("edition", item.edition.as_deref())?;
    for language in &item.language {
        out.text("language", &[], language)?;
    }
    for script in &item.script {
        out.text("script", &[], script)?;
    }
    for abstract_text in &item.abstract_text {
        let mut attrs = vec![("format", "text/plain")];
        if let Some(language) = abstract_text.language.as_deref() {
            attrs.push(("language", language));
        }
        if let Some(script) = abstract_text.script.as_deref() {
            attrs.push(("script", script));
        }
        out.text("abstract", &attrs, &abstract_text.content)?;
    }
    if let Some(status) = &item.docstatus {
        out.start("status", &[])?;
        out.text("stage", &[], &status.stage)?;
        out.opt_text("substage", status.substage.as_deref())?;
        out.opt_text("iteration", status.iteration.as_deref())?;
        out.end("status")?;
    }
    for relation in &item.relation {
        out.start("relation", &[("type", relation.kind.as_str())])?;
        out.start("bibitem", &[])?;
        out.text(
            "formattedref",
            &[("format", "text/plain")],
            &relation.bibitem.formattedref,
        )?;
        if let Some(link) = relation.bibitem.link.as_deref() {
            out.text("uri", &[("type", "src")], link)?;
        }
        out.end("bibitem")?;
        out.end("relation")?;
    }
    for series in &item.series {
        let attrs: Vec<(&str, &str)> = series
            .kind
            .as_deref()
            .map(|k| ("type", k))
            .into_iter()
            .collect();
        out.start("series", &attrs)?;
        out.text("title", &[("format", "text/plain")], &series.title)?;
        out.opt_text("abbreviation", series.abbreviation.as_deref())?;
        out.opt_text("number", series.number.as_deref())?;
        out.end("series")?;
    }
    for keyword in &item.keyword {
        out.text("keyword", &[], keyword)?;
    }

    if options.bibdata && !item.ext.is_empty() {
        out.start("ext", &[])?;
        out.opt_text("doctype", item.ext.doctype.as_deref())?;
        if let Some(period) = &item.ext.commentperiod {
            write_comment_period(&mut out, period)?;
        }
        out.end("ext")?;
    }

    out.end(root)?;
    String::from_utf8(out.writer.into_inner()).map_err(|e| OutputError::Xml(e.to_string()))
}

fn write_contributor(out: &mut XmlOut, contributor: &Contributor) -> Result<(), OutputError> {
    out.start("contributor", &[])?;
    for role in &contributor.role {
        out.empty("role", &[("type", role.kind.as_str())])?;
    }
    if let Some(organization) = &contributor.organization {
        write_organization(out, organization)?;
    }
    if let Some(person) = &contributor.person {
        out.start("person", &[])?;
        out.start("name", &[])?;
        match &person.name.completename {
            Some(complete) => out.text("completename", &[], complete)?,
            None => {
                for forename in &person.name.forename {
                    out.text("forename", &[], forename)?;
                }
                out.opt_text("surname", person.name.surname.as_deref())?;
                for addition in &person.name.addition {
                    out.text("addition", &[], addition)?;
                }
            }
        }
        out.end("name")?;
        for affiliation in &person.affiliation {
            out.start("affiliation", &[])?;
            write_organization(out, &affiliation.organization)?;
            out.end("affiliation")?;
        }
        out.end("person")?;
    }
    out.end("contributor")
}

fn write_organization(out: &mut XmlOut, organization: &Organization) -> Result<(), OutputError> {
    out.start("organization", &[])?;
    out.text("name", &[], &organization.name)?;
    out.opt_text("abbreviation", organization.abbreviation.as_deref())?;
    out.opt_text("uri", organization.uri.as_deref())?;
    out.end("organization")
}

fn write_comment_period(out: &mut XmlOut, period: &CommentPeriod) -> Result<(), OutputError> {
    out.start("commentperiod", &[])?;
    out.text("from", &[], &period.from.to_string())?;
    if let Some(to) = period.to {
        out.text("to", &[], &to.to_string())?;
    }
    if let Some(extended) = period.extended {
        out.text("extended", &[], &extended.to_string())?;
    }
    out.end("commentperiod")
}
