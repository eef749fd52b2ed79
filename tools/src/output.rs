// Jackson Coxson
// Renders lockdown values the way libimobiledevice's tools print them

use std::io::{self, Write};

use base64::{Engine, prelude::BASE64_STANDARD};
use plist::Value;

use crate::cli::OutputFormat;

/// Writes `value` to `out` in the requested format
pub fn write_value<W: Write>(out: &mut W, value: &Value, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::KeyValue => write_key_value(out, value),
        OutputFormat::Xml => write_xml(out, value),
    }
}

/// Plain text dump, one `key: value` per line with nested containers indented by one space
pub fn write_key_value<W: Write>(out: &mut W, value: &Value) -> io::Result<()> {
    match value {
        Value::Dictionary(dict) => write_dictionary(out, dict, 0),
        Value::Array(array) => write_array(out, array, 0),
        other => write_node(out, other, 0),
    }
}

pub fn write_xml<W: Write>(out: &mut W, value: &Value) -> io::Result<()> {
    let mut buf = Vec::new();
    value.to_writer_xml(&mut buf).map_err(io::Error::other)?;
    if buf.last() != Some(&b'\n') {
        buf.push(b'\n');
    }
    out.write_all(&buf)
}

fn write_dictionary<W: Write>(
    out: &mut W,
    dict: &plist::Dictionary,
    indent: usize,
) -> io::Result<()> {
    for (key, value) in dict {
        write!(out, "{:indent$}{key}", "")?;
        match value {
            Value::Array(array) => write!(out, "[{}]: ", array.len())?,
            _ => write!(out, ": ")?,
        }
        write_node(out, value, indent)?;
    }
    Ok(())
}

fn write_array<W: Write>(out: &mut W, array: &[Value], indent: usize) -> io::Result<()> {
    for (i, value) in array.iter().enumerate() {
        write!(out, "{:indent$}{i}: ", "")?;
        write_node(out, value, indent)?;
    }
    Ok(())
}

fn write_node<W: Write>(out: &mut W, value: &Value, indent: usize) -> io::Result<()> {
    match value {
        Value::Dictionary(dict) => {
            writeln!(out)?;
            write_dictionary(out, dict, indent + 1)
        }
        Value::Array(array) => {
            writeln!(out)?;
            write_array(out, array, indent + 1)
        }
        Value::Boolean(b) => writeln!(out, "{b}"),
        Value::Integer(i) => match (i.as_signed(), i.as_unsigned()) {
            (_, Some(u)) => writeln!(out, "{u}"),
            (Some(s), None) => writeln!(out, "{s}"),
            (None, None) => writeln!(out),
        },
        Value::Real(r) => writeln!(out, "{r:.6}"),
        Value::String(s) => writeln!(out, "{s}"),
        Value::Data(d) => writeln!(out, "{}", BASE64_STANDARD.encode(d)),
        Value::Date(d) => writeln!(out, "{}", format_date(d)),
        Value::Uid(u) => writeln!(out, "{}", u.get()),
        _ => writeln!(out),
    }
}

/// `YYYY-MM-DDTHH:MM:SSZ`, fractional seconds dropped
fn format_date(date: &plist::Date) -> String {
    let xml = date.to_xml_format();
    match xml.find('.') {
        Some(dot) => format!("{}Z", &xml[..dot]),
        None => xml,
    }
}
