//! BIND zone file export and import
//!
//! Export renders Vultr DNS records as a standard zone file. Import parses
//! a zone file line by line into records that can be created through the
//! API; SOA records are skipped because Vultr manages them.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// TTL used when neither the record nor a `$TTL` directive sets one
pub const DEFAULT_ZONE_TTL: u32 = 3600;

/// Record types in the order they are written to an exported zone file
const EXPORT_ORDER: [&str; 8] = ["SOA", "NS", "A", "AAAA", "CNAME", "MX", "TXT", "SRV"];

/// Record types accepted on import
const IMPORT_TYPES: [&str; 8] = ["A", "AAAA", "CNAME", "MX", "TXT", "NS", "SRV", "PTR"];

/// Zone file errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ZoneError {
    #[error("Invalid priority '{0}'")]
    InvalidPriority(String),

    #[error("Invalid $TTL directive")]
    InvalidTtlDirective,

    #[error("Invalid $ORIGIN directive")]
    InvalidOriginDirective,
}

/// A record parsed from one zone file line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub data: String,
    pub ttl: u32,
    pub priority: Option<u32>,
}

/// Outcome of parsing one significant zone file line
#[derive(Debug, Clone, PartialEq)]
pub enum ZoneLine {
    Record {
        line_no: usize,
        line: String,
        record: ParsedRecord,
    },
    Error {
        line_no: usize,
        line: String,
        message: String,
    },
}

impl ZoneLine {
    fn error(line_no: usize, line: &str, err: ZoneError) -> Self {
        ZoneLine::Error {
            line_no,
            line: line.to_string(),
            message: format!("Line {}: {}", line_no, err),
        }
    }
}

/// Render records as a zone file for `domain`
pub fn export_zone_file(domain: &str, records: &[Value]) -> String {
    let mut lines = vec![
        format!("; Zone file for {}", domain),
        "; Generated by mcp-vultr".to_string(),
        format!("$ORIGIN {}.", domain),
        format!("$TTL {}", DEFAULT_ZONE_TTL),
        String::new(),
    ];

    let record_type = |r: &Value| r.get("type").and_then(Value::as_str).unwrap_or("").to_string();

    let mut ordered: Vec<&Value> = Vec::with_capacity(records.len());
    for wanted in EXPORT_ORDER {
        ordered.extend(records.iter().filter(|r| record_type(r) == wanted));
    }
    ordered.extend(
        records
            .iter()
            .filter(|r| !EXPORT_ORDER.contains(&record_type(r).as_str())),
    );

    for record in ordered {
        lines.push(format_record(record));
    }

    lines.join("\n")
}

fn format_record(record: &Value) -> String {
    let name = record
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.is_empty())
        .unwrap_or("@");
    let ttl = record
        .get("ttl")
        .and_then(Value::as_u64)
        .unwrap_or(DEFAULT_ZONE_TTL as u64);
    let rtype = record.get("type").and_then(Value::as_str).unwrap_or("");
    let data = record.get("data").and_then(Value::as_str).unwrap_or("");
    let priority = record
        .get("priority")
        .and_then(Value::as_u64)
        .unwrap_or(0);

    match rtype {
        "MX" => format!("{}\t{}\tIN\tMX\t{}\t{}", name, ttl, priority, data),
        "SRV" => {
            let parts: Vec<&str> = data.split_whitespace().collect();
            if parts.len() >= 3 {
                let weight = if parts.len() > 3 { parts[0] } else { "0" };
                let port = parts[parts.len() - 2];
                let target = parts[parts.len() - 1];
                format!(
                    "{}\t{}\tIN\tSRV\t{}\t{}\t{}\t{}",
                    name, ttl, priority, weight, port, target
                )
            } else {
                format!("{}\t{}\tIN\tSRV\t{}\t{}", name, ttl, priority, data)
            }
        }
        "TXT" => {
            let quoted = data.len() >= 2 && data.starts_with('"') && data.ends_with('"');
            if quoted {
                format!("{}\t{}\tIN\tTXT\t{}", name, ttl, data)
            } else {
                format!("{}\t{}\tIN\tTXT\t\"{}\"", name, ttl, data)
            }
        }
        _ => format!("{}\t{}\tIN\t{}\t{}", name, ttl, rtype, data),
    }
}

/// Split a zone line on blanks outside double quotes. Quotes stay in the
/// token; an escaped quote does not open or close a quoted run.
pub fn tokenize(line: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in line.chars() {
        match c {
            '"' if !current.ends_with('\\') => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ' ' | '\t' if !in_quotes => {
                if !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }

    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Parse one record line: `name [ttl] [IN] type data...`.
///
/// Returns `Ok(None)` for lines that are not records we can import.
/// Fully-qualified names inside `origin` are made relative to it.
pub fn parse_zone_line(
    line: &str,
    default_ttl: u32,
    origin: &str,
) -> Result<Option<ParsedRecord>, ZoneError> {
    let parts = tokenize(line);
    if parts.len() < 4 {
        return Ok(None);
    }

    let mut ttl = default_ttl;
    let mut found: Option<(String, usize)> = None;

    for (i, part) in parts.iter().enumerate().skip(1) {
        let upper = part.to_uppercase();
        if IMPORT_TYPES.contains(&upper.as_str()) {
            found = Some((upper, i + 1));
            break;
        } else if upper == "IN" {
            continue;
        } else if !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(value) = part.parse() {
                ttl = value;
            }
        }
    }

    let (record_type, data_start) = match found {
        Some(found) if found.1 < parts.len() => found,
        _ => return Ok(None),
    };

    let name = relative_name(&parts[0], origin);
    let data_parts = &parts[data_start..];

    let (data, priority) = match record_type.as_str() {
        "MX" => {
            if data_parts.len() < 2 {
                return Ok(None);
            }
            (data_parts[1].clone(), Some(parse_priority(&data_parts[0])?))
        }
        "SRV" => {
            if data_parts.len() < 4 {
                return Ok(None);
            }
            let priority = parse_priority(&data_parts[0])?;
            (data_parts[1..4].join(" "), Some(priority))
        }
        "TXT" => {
            let joined = data_parts.join(" ");
            let unquoted = if joined.len() >= 2 && joined.starts_with('"') && joined.ends_with('"') {
                joined[1..joined.len() - 1].to_string()
            } else {
                joined
            };
            (unquoted, None)
        }
        _ => (data_parts.join(" "), None),
    };

    Ok(Some(ParsedRecord {
        name,
        record_type,
        data,
        ttl,
        priority,
    }))
}

fn relative_name(raw: &str, origin: &str) -> String {
    if raw == "@" {
        return String::new();
    }
    let Some(absolute) = raw.strip_suffix('.') else {
        return raw.to_string();
    };

    let origin = origin.trim_end_matches('.');
    if origin.is_empty() {
        return absolute.to_string();
    }
    if absolute.eq_ignore_ascii_case(origin) {
        return String::new();
    }
    match absolute
        .len()
        .checked_sub(origin.len() + 1)
        .filter(|&cut| absolute.is_char_boundary(cut))
    {
        Some(cut) if absolute[cut..].eq_ignore_ascii_case(&format!(".{}", origin)) => {
            absolute[..cut].to_string()
        }
        _ => absolute.to_string(),
    }
}

fn parse_priority(token: &str) -> Result<u32, ZoneError> {
    token
        .parse()
        .map_err(|_| ZoneError::InvalidPriority(token.to_string()))
}

fn is_soa_line(line: &str) -> bool {
    line.contains("\tSOA\t") || line.contains(" SOA ")
}

/// Parse a whole zone file for `domain`.
///
/// Directives update the running TTL and origin; each record line yields a
/// record or an error entry. Lines that are not records are dropped.
pub fn parse_zone(zone_data: &str, domain: &str) -> Vec<ZoneLine> {
    let mut results = Vec::new();
    let mut current_ttl = DEFAULT_ZONE_TTL;
    let mut origin = domain.trim_end_matches('.').to_string();

    for (index, raw) in zone_data.trim().lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();

        if line.is_empty() || line.starts_with(';') {
            continue;
        }

        if line.starts_with("$TTL") {
            match line.split_whitespace().nth(1).map(str::parse::<u32>) {
                Some(Ok(ttl)) => current_ttl = ttl,
                _ => results.push(ZoneLine::error(line_no, line, ZoneError::InvalidTtlDirective)),
            }
            continue;
        }

        if line.starts_with("$ORIGIN") {
            match line.split_whitespace().nth(1) {
                Some(value) => origin = value.trim_end_matches('.').to_string(),
                None => {
                    results.push(ZoneLine::error(line_no, line, ZoneError::InvalidOriginDirective))
                }
            }
            continue;
        }

        if is_soa_line(line) {
            continue;
        }

        match parse_zone_line(line, current_ttl, &origin) {
            Ok(Some(record)) => results.push(ZoneLine::Record {
                line_no,
                line: line.to_string(),
                record,
            }),
            Ok(None) => {}
            Err(e) => results.push(ZoneLine::error(line_no, line, e)),
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_export_header_and_order() {
        let records = vec![
            json!({"type": "TXT", "name": "@", "data": "v=spf1 -all", "ttl": 300}),
            json!({"type": "CAA", "name": "@", "data": "0 issue \"letsencrypt.org\"", "ttl": 300}),
            json!({"type": "A", "name": "", "data": "192.0.2.1", "ttl": 300}),
            json!({"type": "MX", "name": "@", "data": "mail.example.com", "ttl": 300, "priority": 10}),
            json!({"type": "NS", "name": "@", "data": "ns1.vultr.com", "ttl": 300}),
        ];

        let zone = export_zone_file("example.com", &records);
        let lines: Vec<&str> = zone.lines().collect();

        assert_eq!(lines[0], "; Zone file for example.com");
        assert_eq!(lines[1], "; Generated by mcp-vultr");
        assert_eq!(lines[2], "$ORIGIN example.com.");
        assert_eq!(lines[3], "$TTL 3600");
        assert_eq!(lines[4], "");
        assert_eq!(lines[5], "@\t300\tIN\tNS\tns1.vultr.com");
        assert_eq!(lines[6], "@\t300\tIN\tA\t192.0.2.1");
        assert_eq!(lines[7], "@\t300\tIN\tMX\t10\tmail.example.com");
        assert_eq!(lines[8], "@\t300\tIN\tTXT\t\"v=spf1 -all\"");
        assert!(lines[9].contains("\tCAA\t"));
    }

    #[test]
    fn test_export_srv_and_defaults() {
        let records = vec![
            json!({"type": "SRV", "name": "_sip._tcp", "data": "5 5060 sip.example.com", "priority": 10}),
            json!({"type": "SRV", "name": "_xmpp._tcp", "data": "20 10 5222 xmpp.example.com", "ttl": 600, "priority": 5}),
            json!({"type": "TXT", "data": "\"already quoted\""}),
        ];

        let zone = export_zone_file("example.com", &records);
        assert!(zone.contains("_sip._tcp\t3600\tIN\tSRV\t10\t0\t5060\tsip.example.com"));
        assert!(zone.contains("_xmpp._tcp\t600\tIN\tSRV\t5\t20\t5222\txmpp.example.com"));
        assert!(zone.contains("@\t3600\tIN\tTXT\t\"already quoted\""));
    }

    #[test]
    fn test_tokenize_keeps_quoted_runs() {
        assert_eq!(
            tokenize("@ 300 IN TXT \"v=spf1 include:_spf.google.com ~all\""),
            vec!["@", "300", "IN", "TXT", "\"v=spf1 include:_spf.google.com ~all\""]
        );
        assert_eq!(tokenize("a\t\tb  c"), vec!["a", "b", "c"]);
        assert_eq!(
            tokenize(r#"x TXT "say \"hi there\"""#),
            vec!["x", "TXT", r#""say \"hi there\"""#]
        );
    }

    #[test]
    fn test_parse_simple_records() {
        let record = parse_zone_line("www 300 IN A 192.0.2.10", 3600, "example.com")
            .unwrap()
            .unwrap();
        assert_eq!(record.name, "www");
        assert_eq!(record.record_type, "A");
        assert_eq!(record.data, "192.0.2.10");
        assert_eq!(record.ttl, 300);
        assert_eq!(record.priority, None);

        let record = parse_zone_line("@ IN cname target.example.net.", 900, "example.com")
            .unwrap()
            .unwrap();
        assert_eq!(record.name, "");
        assert_eq!(record.record_type, "CNAME");
        assert_eq!(record.ttl, 900);
    }

    #[test]
    fn test_parse_mx_srv_txt() {
        let mx = parse_zone_line("@ 3600 IN MX 10 mail.example.com.", 3600, "example.com")
            .unwrap()
            .unwrap();
        assert_eq!(mx.priority, Some(10));
        assert_eq!(mx.data, "mail.example.com.");

        let srv = parse_zone_line("_sip._tcp 600 IN SRV 10 20 5060 sip.example.com.", 3600, "example.com")
            .unwrap()
            .unwrap();
        assert_eq!(srv.priority, Some(10));
        assert_eq!(srv.data, "20 5060 sip.example.com.");

        let txt = parse_zone_line("@ 300 IN TXT \"hello world\"", 3600, "example.com")
            .unwrap()
            .unwrap();
        assert_eq!(txt.data, "hello world");
    }

    #[test]
    fn test_parse_rejects_incomplete_lines() {
        assert_eq!(parse_zone_line("@ IN A", 3600, "example.com"), Ok(None));
        assert_eq!(parse_zone_line("@ 300 IN HINFO x", 3600, "example.com"), Ok(None));
        assert_eq!(parse_zone_line("@ 300 IN MX 10", 3600, "example.com"), Ok(None));
        assert_eq!(parse_zone_line("_s 300 IN SRV 1 2 3", 3600, "example.com"), Ok(None));
        assert_eq!(
            parse_zone_line("@ 300 IN MX ten mail.example.com", 3600, "example.com"),
            Err(ZoneError::InvalidPriority("ten".to_string()))
        );
    }

    #[test]
    fn test_fully_qualified_names_become_relative() {
        let record = parse_zone_line("www.example.com. 300 IN A 192.0.2.1", 3600, "example.com")
            .unwrap()
            .unwrap();
        assert_eq!(record.name, "www");

        let record = parse_zone_line("example.com. 300 IN A 192.0.2.1", 3600, "example.com")
            .unwrap()
            .unwrap();
        assert_eq!(record.name, "");

        let record = parse_zone_line("other.net. 300 IN A 192.0.2.1", 3600, "example.com")
            .unwrap()
            .unwrap();
        assert_eq!(record.name, "other.net");
    }

    #[test]
    fn test_origin_directive_drives_relative_names() {
        let zone = "\
WWW.Example.COM. 300 IN A 192.0.2.1
$ORIGIN sub.example.com.
api.sub.example.com. 300 IN A 192.0.2.2
api.example.com. 300 IN A 192.0.2.3
";
        let names: Vec<String> = parse_zone(zone, "example.com")
            .into_iter()
            .filter_map(|line| match line {
                ZoneLine::Record { record, .. } => Some(record.name),
                ZoneLine::Error { .. } => None,
            })
            .collect();
        assert_eq!(names, vec!["WWW", "api", "api.example.com"]);
    }

    #[test]
    fn test_parse_zone_directives_and_errors() {
        let zone = "\
; comment
$TTL 600
$ORIGIN example.com.
@\tIN\tSOA\tns1.vultr.com. admin.example.com. 1 2 3 4 5
www IN A 192.0.2.1
$TTL abc
mail IN MX x mail.example.com
$ORIGIN
junk
";
        let results = parse_zone(zone, "example.com");
        assert_eq!(results.len(), 4);

        match &results[0] {
            ZoneLine::Record { line_no, record, .. } => {
                assert_eq!(*line_no, 5);
                assert_eq!(record.name, "www");
                assert_eq!(record.ttl, 600);
            }
            other => panic!("unexpected {:?}", other),
        }
        match &results[1] {
            ZoneLine::Error { message, .. } => assert_eq!(message, "Line 6: Invalid $TTL directive"),
            other => panic!("unexpected {:?}", other),
        }
        match &results[2] {
            ZoneLine::Error { message, line, .. } => {
                assert_eq!(message, "Line 7: Invalid priority 'x'");
                assert_eq!(line, "mail IN MX x mail.example.com");
            }
            other => panic!("unexpected {:?}", other),
        }
        match &results[3] {
            ZoneLine::Error { message, .. } => assert_eq!(message, "Line 8: Invalid $ORIGIN directive"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_export_then_import_preserves_records() {
        let records = vec![
            json!({"type": "A", "name": "www", "data": "192.0.2.1", "ttl": 300}),
            json!({"type": "MX", "name": "@", "data": "mail.example.com", "ttl": 300, "priority": 10}),
            json!({"type": "TXT", "name": "@", "data": "v=spf1 mx -all", "ttl": 300}),
        ];

        let zone = export_zone_file("example.com", &records);
        let parsed: Vec<ParsedRecord> = parse_zone(&zone, "example.com")
            .into_iter()
            .filter_map(|line| match line {
                ZoneLine::Record { record, .. } => Some(record),
                ZoneLine::Error { .. } => None,
            })
            .collect();

        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].name, "www");
        assert_eq!(parsed[1].priority, Some(10));
        assert_eq!(parsed[2].data, "v=spf1 mx -all");
    }
}
