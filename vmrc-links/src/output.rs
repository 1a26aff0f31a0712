//! Rendering of VM records as text or JSON.

use std::io::Write;

use serde::Serialize;

use crate::error::Result;
use crate::inventory::VmRecord;

/// Remote-console URI for a VM, in the form the VMware Remote Console
/// application registers as its URL handler.
pub fn console_uri(user: &str, host: &str, port: u16, moid: &str) -> String {
    format!("vmrc://{user}@{host}:{port}/?moid={moid}")
}

/// One VM as aligned key/value lines. Blank optional fields are omitted and
/// records are separated by an empty line.
pub fn write_record<W: Write>(out: &mut W, record: &VmRecord, console: &str) -> Result<()> {
    writeln!(out, "Name       : {}", record.name)?;
    writeln!(out, "Path       : {}", record.path)?;
    writeln!(out, "Guest      : {}", record.guest)?;
    writeln!(out, "Console    : {console}")?;
    if let Some(annotation) = &record.annotation {
        writeln!(out, "Annotation : {annotation}")?;
    }
    writeln!(out, "State      : {}", record.power_state)?;
    if let Some(ip) = &record.ip_address {
        writeln!(out, "IP         : {ip}")?;
    }
    if let Some(question) = &record.question {
        writeln!(out, "Question   : {question}")?;
    }
    writeln!(out)?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct JsonRecord<'a> {
    #[serde(flatten)]
    record: &'a VmRecord,
    console: &'a str,
}

/// All visited records as one JSON array.
pub fn write_json<W: Write>(out: &mut W, records: &[(VmRecord, String)]) -> Result<()> {
    let rows: Vec<JsonRecord<'_>> = records
        .iter()
        .map(|(record, console)| JsonRecord {
            record,
            console: console.as_str(),
        })
        .collect();
    serde_json::to_writer_pretty(&mut *out, &rows)?;
    writeln!(out)?;
    Ok(())
}
