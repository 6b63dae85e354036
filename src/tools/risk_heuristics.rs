//! Deterministic heuristic risk scoring
//!
//! A pure function over an extracted-clause mapping: scans clause text for
//! case-insensitive substring markers, sums the points, clamps to [0, 100]
//! and buckets the total into a risk level. Marker checks are independent of
//! each other and of evaluation order.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::tools::{Tool, ToolError, ToolKind, ToolResult, ToolSpec};

/// Uncapped or unlimited liability
pub const LIABILITY_UNCAPPED_POINTS: u32 = 30;
/// Net 60 / Net 90 payment terms
pub const SLOW_PAYMENT_POINTS: u32 = 10;
/// Blanket assignment of all work product
pub const BROAD_IP_ASSIGNMENT_POINTS: u32 = 10;
/// Duty to defend against any and all claims
pub const BROAD_INDEMNITY_POINTS: u32 = 15;

const SCORE_CAP: u32 = 100;

/// Risk bucket derived from the clamped score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Buckets a score: low below 20, medium below 50, high otherwise
    pub fn from_score(score: f64) -> Self {
        if score < 20.0 {
            RiskLevel::Low
        } else if score < 50.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }
}

/// The heuristic scorer's report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_score: u32,
    pub risk_level: RiskLevel,
    pub risk_flags: Vec<String>,
}

/// Scores a clause mapping against the heuristic rubric
pub fn score_clauses(clauses: &Map<String, Value>) -> RiskAssessment {
    let clause = |name: &str| {
        clauses
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_lowercase()
    };

    let mut score = 0u32;
    let mut flags = Vec::new();

    let liability = clause("liability");
    if liability.contains("unlimited") || liability.contains("no limitation") {
        score += LIABILITY_UNCAPPED_POINTS;
        flags.push("liability_unlimited_or_uncapped".to_string());
    }

    let payment = clause("payment");
    if payment.contains("net 60") || payment.contains("net 90") {
        score += SLOW_PAYMENT_POINTS;
        flags.push("slow_payment_terms".to_string());
    }

    let ip = clause("ip");
    if ip.contains("all work product") && ip.contains("assign") {
        score += BROAD_IP_ASSIGNMENT_POINTS;
        flags.push("broad_ip_assignment".to_string());
    }

    let indemnity = clause("indemnity");
    if indemnity.contains("defend") && indemnity.contains("any and all") {
        score += BROAD_INDEMNITY_POINTS;
        flags.push("broad_indemnity_scope".to_string());
    }

    let score = score.min(SCORE_CAP);
    RiskAssessment {
        risk_score: score,
        risk_level: RiskLevel::from_score(score as f64),
        risk_flags: flags,
    }
}

/// Scores basic contract risk heuristics from extracted clauses
/// (deterministic rules)
pub struct RiskHeuristicsTool;

#[async_trait::async_trait]
impl Tool for RiskHeuristicsTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            "score_risk_heuristics",
            "Scores basic contract risk heuristics from extracted clauses (deterministic rules).",
            json!({
                "type": "object",
                "properties": {
                    "clauses": { "type": "object" }
                },
                "required": ["clauses"]
            }),
        )
    }

    fn kind(&self) -> ToolKind {
        ToolKind::RiskScoring
    }

    async fn run(&self, args: Map<String, Value>) -> ToolResult<Map<String, Value>> {
        let clauses = args
            .get("clauses")
            .and_then(Value::as_object)
            .ok_or_else(|| ToolError::InvalidArguments {
                tool: "score_risk_heuristics".to_string(),
                message: "missing required object parameter 'clauses'".to_string(),
            })?;

        let assessment = score_clauses(clauses);
        tracing::debug!(
            risk_score = assessment.risk_score,
            flags = assessment.risk_flags.len(),
            "scored clauses heuristically"
        );

        match serde_json::to_value(&assessment) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(ToolError::ExecutionFailed {
                tool: "score_risk_heuristics".to_string(),
                message: "assessment did not serialize to an object".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clauses(pairs: &[(&str, &str)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect()
    }

    #[test]
    fn test_unlimited_liability_scores_medium() {
        let result = score_clauses(&clauses(&[(
            "liability",
            "Vendor shall have unlimited liability",
        )]));

        assert_eq!(result.risk_score, 30);
        // 20 <= 30 < 50 buckets as medium.
        assert_eq!(result.risk_level, RiskLevel::Medium);
        assert_eq!(result.risk_flags, vec!["liability_unlimited_or_uncapped"]);
    }

    #[test]
    fn test_no_limitation_also_flags_liability() {
        let result = score_clauses(&clauses(&[(
            "liability",
            "There shall be NO LIMITATION of liability hereunder",
        )]));
        assert_eq!(result.risk_score, 30);
        assert_eq!(result.risk_flags, vec!["liability_unlimited_or_uncapped"]);
    }

    #[test]
    fn test_slow_payment_terms() {
        for terms in ["invoices due Net 60", "payable net 90 days"] {
            let result = score_clauses(&clauses(&[("payment", terms)]));
            assert_eq!(result.risk_score, 10);
            assert_eq!(result.risk_level, RiskLevel::Low);
            assert_eq!(result.risk_flags, vec!["slow_payment_terms"]);
        }
    }

    #[test]
    fn test_broad_ip_assignment_needs_both_markers() {
        let result = score_clauses(&clauses(&[(
            "ip",
            "Contractor hereby assigns all work product to Customer",
        )]));
        assert_eq!(result.risk_score, 10);
        assert_eq!(result.risk_flags, vec!["broad_ip_assignment"]);

        let result = score_clauses(&clauses(&[("ip", "all work product remains contractor's")]));
        assert_eq!(result.risk_score, 0);
        assert!(result.risk_flags.is_empty());
    }

    #[test]
    fn test_broad_indemnity_scope() {
        let result = score_clauses(&clauses(&[(
            "indemnity",
            "Supplier shall defend Customer against any and all claims",
        )]));
        assert_eq!(result.risk_score, 15);
        assert_eq!(result.risk_flags, vec!["broad_indemnity_scope"]);
    }

    #[test]
    fn test_all_markers_sum_to_high() {
        let result = score_clauses(&clauses(&[
            ("liability", "unlimited liability"),
            ("payment", "net 90"),
            ("ip", "assigns all work product"),
            ("indemnity", "defend against any and all claims"),
        ]));

        assert_eq!(result.risk_score, 65);
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(result.risk_flags.len(), 4);
    }

    #[test]
    fn test_empty_clauses_score_zero() {
        let result = score_clauses(&Map::new());
        assert_eq!(result.risk_score, 0);
        assert_eq!(result.risk_level, RiskLevel::Low);
        assert!(result.risk_flags.is_empty());
    }

    #[test]
    fn test_level_bucket_boundaries() {
        assert_eq!(RiskLevel::from_score(0.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(19.9), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(20.0), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(49.9), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(50.0), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(100.0), RiskLevel::High);
    }

    #[tokio::test]
    async fn test_tool_requires_clauses_object() {
        let err = RiskHeuristicsTool.run(Map::new()).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[tokio::test]
    async fn test_tool_result_shape() {
        let mut args = Map::new();
        args.insert(
            "clauses".to_string(),
            json!({"liability": "unlimited liability"}),
        );

        let result = RiskHeuristicsTool.run(args).await.unwrap();
        assert_eq!(result["risk_score"], 30);
        assert_eq!(result["risk_level"], "medium");
        assert_eq!(result["risk_flags"][0], "liability_unlimited_or_uncapped");
    }
}
