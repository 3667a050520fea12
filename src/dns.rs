//! DNS record validation and configuration analysis

use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Record types Vultr DNS accepts
pub const SUPPORTED_RECORD_TYPES: [&str; 7] = ["A", "AAAA", "CNAME", "MX", "TXT", "NS", "SRV"];

pub const DEFAULT_TTL: u32 = 300;
pub const MIN_TTL: u32 = 60;
pub const MAX_TTL: u32 = 86400;

/// TTLs below this are flagged as low
const LOW_TTL: i64 = 300;

/// Outcome of checking a record before it is created
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct RecordValidation {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
}

impl RecordValidation {
    fn error(&mut self, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(message.into());
    }
}

/// The record that was checked, echoed back with its validation
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub record_type: String,
    pub name: String,
    pub data: String,
    pub ttl: Option<i64>,
    pub priority: Option<i64>,
    pub validation: RecordValidation,
}

/// Check a DNS record for obvious mistakes
pub fn validate_record(
    record_type: &str,
    name: &str,
    data: &str,
    ttl: Option<i64>,
    priority: Option<i64>,
) -> ValidationReport {
    let mut v = RecordValidation {
        valid: true,
        ..Default::default()
    };
    let record_type = record_type.to_uppercase();

    if !SUPPORTED_RECORD_TYPES.contains(&record_type.as_str()) {
        v.error(format!(
            "Invalid record type. Must be one of: {}",
            SUPPORTED_RECORD_TYPES.join(", ")
        ));
    }

    if let Some(ttl) = ttl {
        if ttl < MIN_TTL as i64 || ttl > MAX_TTL as i64 {
            v.warnings.push(format!(
                "TTL should be between {} and {} seconds",
                MIN_TTL, MAX_TTL
            ));
        } else if ttl < LOW_TTL {
            v.warnings
                .push("Low TTL values may impact DNS performance".to_string());
        }
    }

    match record_type.as_str() {
        "A" => {
            if data.parse::<Ipv4Addr>().is_err() {
                v.error("Invalid IPv4 address format");
            }
        }
        "AAAA" => check_ipv6(data, &mut v),
        "CNAME" => {
            if name.is_empty() || name == "@" {
                v.error("CNAME records cannot be used for root domain (@)");
            }
        }
        "MX" => match priority {
            None => v.error("MX records require a priority value"),
            Some(p) if !(0..=65535).contains(&p) => {
                v.error("MX priority must be between 0 and 65535")
            }
            Some(_) => {}
        },
        "SRV" => {
            if priority.is_none() {
                v.error("SRV records require a priority value");
            }
            if data.split_whitespace().count() != 3 {
                v.error("SRV data must be in format: 'weight port target'");
            }
        }
        _ => {}
    }

    ValidationReport {
        record_type,
        name: name.to_string(),
        data: data.to_string(),
        ttl,
        priority,
        validation: v,
    }
}

fn check_ipv6(data: &str, v: &mut RecordValidation) {
    let addr: Ipv6Addr = match data.parse() {
        Ok(addr) => addr,
        Err(e) => {
            v.error(format!("Invalid IPv6 address: {}", e));
            return;
        }
    };

    let compressed = addr.to_string();
    if addr.to_ipv4_mapped().is_some() {
        v.suggestions.push(
            "Consider using a native IPv6 address instead of IPv4-mapped format".to_string(),
        );
    } else if compressed != data {
        v.suggestions
            .push(format!("Consider using compressed format: {}", compressed));
    }

    let first = addr.segments()[0];
    if addr.is_loopback() {
        v.warnings
            .push("This is the IPv6 loopback address (::1)".to_string());
    } else if first & 0xffc0 == 0xfe80 {
        v.warnings
            .push("This is an IPv6 link-local address (fe80::/10)".to_string());
    } else if first & 0xfe00 == 0xfc00 {
        v.warnings
            .push("This is an IPv6 unique local address (fc00::/7)".to_string());
    }
}

/// Which baseline records a domain has
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConfigurationStatus {
    pub has_root_domain: bool,
    pub has_www_subdomain: bool,
    pub has_email_mx: bool,
    pub has_spf_protection: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSummary {
    pub total_records: usize,
    pub record_types: BTreeMap<String, usize>,
    pub average_ttl: i64,
    pub configuration_status: ConfigurationStatus,
}

/// DNS configuration review for one domain
#[derive(Debug, Clone, Serialize)]
pub struct RecordAnalysis {
    pub domain: String,
    pub analysis: AnalysisSummary,
    pub recommendations: Vec<String>,
    pub potential_issues: Vec<String>,
    pub records_detail: Vec<Value>,
}

/// Review a domain's records and suggest improvements
pub fn analyze_records(domain: &str, records: &[Value]) -> RecordAnalysis {
    let mut record_types: BTreeMap<String, usize> = BTreeMap::new();
    let mut ttls = Vec::with_capacity(records.len());
    let mut status = ConfigurationStatus {
        has_root_domain: false,
        has_www_subdomain: false,
        has_email_mx: false,
        has_spf_protection: false,
    };

    for record in records {
        let rtype = record
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("UNKNOWN");
        let name = record.get("name").and_then(Value::as_str).unwrap_or("");
        let data = record.get("data").and_then(Value::as_str).unwrap_or("");
        let ttl = record
            .get("ttl")
            .and_then(Value::as_i64)
            .unwrap_or(DEFAULT_TTL as i64);

        *record_types.entry(rtype.to_string()).or_insert(0) += 1;
        ttls.push(ttl);

        if rtype == "A" && (name == "@" || name.is_empty() || name == domain) {
            status.has_root_domain = true;
        }
        if name == "www" {
            status.has_www_subdomain = true;
        }
        if rtype == "MX" {
            status.has_email_mx = true;
        }
        if rtype == "TXT" && data.to_lowercase().contains("spf1") {
            status.has_spf_protection = true;
        }
    }

    let total = records.len();
    let mut recommendations = Vec::new();
    if !status.has_root_domain {
        recommendations.push("Consider adding an A record for the root domain (@)".to_string());
    }
    if !status.has_www_subdomain {
        recommendations.push("Consider adding a www subdomain (A or CNAME record)".to_string());
    }
    if !status.has_email_mx && total > 1 {
        recommendations.push("Consider adding MX records if you plan to use email".to_string());
    }
    if status.has_email_mx && !status.has_spf_protection {
        recommendations.push("Add SPF record (TXT) to prevent email spoofing".to_string());
    }

    let mut potential_issues = Vec::new();
    let low = ttls.iter().filter(|&&ttl| ttl < LOW_TTL).count();
    if low * 2 > total {
        potential_issues.push(
            "Many records have very low TTL values, which may impact performance".to_string(),
        );
    }

    let average_ttl = if ttls.is_empty() {
        0
    } else {
        (ttls.iter().sum::<i64>() as f64 / ttls.len() as f64).round() as i64
    };

    RecordAnalysis {
        domain: domain.to_string(),
        analysis: AnalysisSummary {
            total_records: total,
            record_types,
            average_ttl,
            configuration_status: status,
        },
        recommendations,
        potential_issues,
        records_detail: records.to_vec(),
    }
}

/// Static catalog of what the DNS tools support
pub fn capabilities() -> Value {
    json!({
        "supported_record_types": [
            {"type": "A", "description": "IPv4 address record", "example": "192.168.1.100", "requires_priority": false},
            {"type": "AAAA", "description": "IPv6 address record", "example": "2001:db8::1", "requires_priority": false},
            {"type": "CNAME", "description": "Canonical name record (alias)", "example": "example.com", "requires_priority": false},
            {"type": "MX", "description": "Mail exchange record", "example": "mail.example.com", "requires_priority": true},
            {"type": "TXT", "description": "Text record for verification and SPF", "example": "v=spf1 include:_spf.google.com ~all", "requires_priority": false},
            {"type": "NS", "description": "Name server record", "example": "ns1.example.com", "requires_priority": false},
            {"type": "SRV", "description": "Service record", "example": "0 5 443 example.com", "requires_priority": true}
        ],
        "operations": {
            "domains": ["list", "create", "delete", "get"],
            "records": ["list", "create", "update", "delete", "get"],
            "zone_files": ["export", "import"]
        },
        "default_ttl": DEFAULT_TTL,
        "min_ttl": MIN_TTL,
        "max_ttl": MAX_TTL
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_a_record() {
        let report = validate_record("a", "www", "192.0.2.1", Some(3600), None);
        assert_eq!(report.record_type, "A");
        assert!(report.validation.valid);
        assert!(report.validation.warnings.is_empty());
    }

    #[test]
    fn test_invalid_type_and_address() {
        let report = validate_record("HINFO", "@", "x", None, None);
        assert!(!report.validation.valid);
        assert!(report.validation.errors[0].starts_with("Invalid record type"));

        let report = validate_record("A", "@", "300.1.1.1", None, None);
        assert_eq!(report.validation.errors, vec!["Invalid IPv4 address format"]);
    }

    #[test]
    fn test_ttl_warnings() {
        let report = validate_record("A", "@", "192.0.2.1", Some(30), None);
        assert!(report.validation.valid);
        assert!(report.validation.warnings[0].contains("should be between"));

        let report = validate_record("A", "@", "192.0.2.1", Some(120), None);
        assert!(report.validation.warnings[0].starts_with("Low TTL"));
    }

    #[test]
    fn test_aaaa_checks() {
        let report = validate_record("AAAA", "@", "2001:0db8:0000:0000:0000:0000:0000:0001", None, None);
        assert!(report.validation.valid);
        assert_eq!(
            report.validation.suggestions,
            vec!["Consider using compressed format: 2001:db8::1"]
        );

        let report = validate_record("AAAA", "@", "::ffff:192.0.2.1", None, None);
        assert!(report.validation.suggestions[0].contains("IPv4-mapped"));

        let report = validate_record("AAAA", "@", "::1", None, None);
        assert!(report.validation.warnings[0].contains("loopback"));

        let report = validate_record("AAAA", "@", "fe80::1", None, None);
        assert!(report.validation.warnings[0].contains("link-local"));

        let report = validate_record("AAAA", "@", "fd00::1", None, None);
        assert!(report.validation.warnings[0].contains("unique local"));

        let report = validate_record("AAAA", "@", "not-an-ip", None, None);
        assert!(!report.validation.valid);
    }

    #[test]
    fn test_cname_mx_srv_rules() {
        assert!(!validate_record("CNAME", "@", "example.com", None, None).validation.valid);
        assert!(!validate_record("CNAME", "", "example.com", None, None).validation.valid);
        assert!(validate_record("CNAME", "www", "example.com", None, None).validation.valid);

        assert!(!validate_record("MX", "@", "mail.example.com", None, None).validation.valid);
        assert!(!validate_record("MX", "@", "mail.example.com", None, Some(70000)).validation.valid);
        assert!(validate_record("MX", "@", "mail.example.com", None, Some(10)).validation.valid);

        let report = validate_record("SRV", "_sip._tcp", "5 5060", None, None);
        assert_eq!(report.validation.errors.len(), 2);
        assert!(validate_record("SRV", "_sip._tcp", "5 5060 sip.example.com", None, Some(10)).validation.valid);
    }

    #[test]
    fn test_analyze_complete_domain() {
        let records = vec![
            json!({"type": "A", "name": "", "data": "192.0.2.1", "ttl": 3600}),
            json!({"type": "CNAME", "name": "www", "data": "example.com", "ttl": 3600}),
            json!({"type": "MX", "name": "", "data": "mail.example.com", "ttl": 3600, "priority": 10}),
            json!({"type": "TXT", "name": "", "data": "v=SPF1 mx -all", "ttl": 3600}),
        ];

        let analysis = analyze_records("example.com", &records);
        assert_eq!(analysis.analysis.total_records, 4);
        assert_eq!(analysis.analysis.average_ttl, 3600);
        assert_eq!(analysis.analysis.record_types.get("A"), Some(&1));
        assert!(analysis.analysis.configuration_status.has_spf_protection);
        assert!(analysis.recommendations.is_empty());
        assert!(analysis.potential_issues.is_empty());
    }

    #[test]
    fn test_analyze_sparse_domain() {
        let records = vec![
            json!({"type": "MX", "name": "@", "data": "mail.example.com", "ttl": 60, "priority": 10}),
            json!({"type": "NS", "name": "@", "data": "ns1.vultr.com", "ttl": 120}),
        ];

        let analysis = analyze_records("example.com", &records);
        assert_eq!(analysis.analysis.average_ttl, 90);
        assert_eq!(analysis.recommendations.len(), 3);
        assert!(analysis.recommendations[2].starts_with("Add SPF"));
        assert_eq!(analysis.potential_issues.len(), 1);
    }

    #[test]
    fn test_analyze_empty_domain() {
        let analysis = analyze_records("example.com", &[]);
        assert_eq!(analysis.analysis.average_ttl, 0);
        assert_eq!(analysis.recommendations.len(), 2);
        assert!(analysis.potential_issues.is_empty());
    }

    #[test]
    fn test_capabilities_catalog() {
        let caps = capabilities();
        assert_eq!(caps["supported_record_types"].as_array().unwrap().len(), 7);
        assert_eq!(caps["max_ttl"], 86400);
    }
}
