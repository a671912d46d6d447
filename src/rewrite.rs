//! Template-preserving customization.
//!
//! A request is turned into an edit plan against the regions of the base
//! document. Replacements and insertions touch only their own byte ranges,
//! so every byte outside the targeted regions is copied through unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use crate::corpus::CorpusStore;
use crate::document::{Document, Identity};
use crate::error::{CoreError, Result};
use crate::regions::{Confidence, ListMarker, Region, RegionDetector, RegionKind};

const CAPABILITIES_HEADING: &str = "### Capabilities";
const STYLE_HEADING: &str = "### Communication Style";
const GUIDELINES_HEADING: &str = "### Guidelines";
const USE_CASE_HEADING: &str = "### Use Case";
const OUTPUT_FORMAT_HEADING: &str = "### Output Format";
const CONTEXT_HEADING: &str = "### Context";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomizationRequest {
    pub base_identity: Option<Identity>,
    #[serde(default)]
    pub use_case: Option<String>,
    #[serde(default)]
    pub role_description: Option<String>,
    #[serde(default)]
    pub tone_preference: Option<String>,
    #[serde(default)]
    pub capabilities_needed: Vec<String>,
    #[serde(default)]
    pub constraints_to_add: Vec<String>,
    #[serde(default)]
    pub output_format: Option<String>,
    #[serde(default)]
    pub additional_context: Option<String>,
}

fn populated(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn populated_items(items: &[String]) -> Vec<&str> {
    items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect()
}

impl CustomizationRequest {
    pub fn new(base_identity: Identity) -> Self {
        Self {
            base_identity: Some(base_identity),
            ..Default::default()
        }
    }

    pub fn is_noop(&self) -> bool {
        populated(&self.use_case).is_none()
            && populated(&self.role_description).is_none()
            && populated(&self.tone_preference).is_none()
            && populated_items(&self.capabilities_needed).is_empty()
            && populated_items(&self.constraints_to_add).is_empty()
            && populated(&self.output_format).is_none()
            && populated(&self.additional_context).is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeAction {
    Replace,
    Append,
    Insert,
    TrailingSection,
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChangeAction::Replace => "replace",
            ChangeAction::Append => "append",
            ChangeAction::Insert => "insert",
            ChangeAction::TrailingSection => "trailing section",
        })
    }
}

/// One entry of the edit plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedChange {
    pub field: &'static str,
    pub action: ChangeAction,
    pub region: Option<RegionKind>,
    pub confidence: Option<Confidence>,
}

impl fmt::Display for PlannedChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[+] {}: {}", self.field, self.action)?;
        if let (Some(region), Some(confidence)) = (self.region, self.confidence) {
            write!(f, " {} ({} confidence)", region, confidence)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Edit {
    start: usize,
    end: usize,
    text: String,
}

struct Plan {
    edits: Vec<Edit>,
    trailing: Vec<String>,
    changes: Vec<PlannedChange>,
}

#[derive(Debug, Clone, Default)]
pub struct TemplateRewriter {
    detector: RegionDetector,
}

impl TemplateRewriter {
    pub fn new(detector: RegionDetector) -> Self {
        Self { detector }
    }

    pub fn build(&self, request: &CustomizationRequest, base: &Document) -> Result<Document> {
        let plan = self.plan(request, base.text())?;
        let text = apply(base.text(), &plan);
        info!(
            "Built template from {} ({} changes, {} -> {} chars)",
            base.label(),
            plan.changes.len(),
            base.len(),
            text.chars().count()
        );
        Ok(Document::derived(text))
    }

    pub fn build_from_store(
        &self,
        request: &CustomizationRequest,
        store: &dyn CorpusStore,
    ) -> Result<Document> {
        let identity = request.base_identity.as_ref().ok_or_else(|| {
            CoreError::InvalidRequest("base_identity is required".to_string())
        })?;
        let base = store.load(identity)?;
        self.build(request, &base)
    }

    pub fn preview(
        &self,
        request: &CustomizationRequest,
        base: &Document,
    ) -> Result<Vec<PlannedChange>> {
        Ok(self.plan(request, base.text())?.changes)
    }

    fn plan(&self, request: &CustomizationRequest, text: &str) -> Result<Plan> {
        if request.is_noop() {
            return Err(CoreError::InvalidRequest(
                "customization request has no populated fields".to_string(),
            ));
        }

        let regions = self.detector.detect(text);
        debug!("{} regions in base", regions.len());

        let role = target(&regions, RegionKind::RoleStatement);
        let insert_at = role.map_or(0, |r| r.span.end);
        let mut edits = Vec::new();
        let mut inserted: Vec<String> = Vec::new();
        let mut changes = Vec::new();

        if let Some(role_text) = populated(&request.role_description) {
            match role {
                Some(region) => {
                    edits.push(Edit {
                        start: region.span.start,
                        end: region.span.end,
                        text: role_text.to_string(),
                    });
                    changes.push(change("role_description", ChangeAction::Replace, Some(region)));
                }
                None => {
                    inserted.push(role_text.to_string());
                    changes.push(change("role_description", ChangeAction::Insert, None));
                }
            }
        }

        let capabilities = populated_items(&request.capabilities_needed);
        if !capabilities.is_empty() {
            match target(&regions, RegionKind::CapabilityBlock) {
                Some(region) => {
                    let marker = first_marker(region.text(text)).unwrap_or_default();
                    edits.push(Edit {
                        start: region.span.start,
                        end: region.span.end,
                        text: render_list(&marker, 0, &capabilities),
                    });
                    changes.push(change(
                        "capabilities_needed",
                        ChangeAction::Replace,
                        Some(region),
                    ));
                }
                None => {
                    inserted.push(format!(
                        "{}\n{}",
                        CAPABILITIES_HEADING,
                        render_list(&ListMarker::default(), 0, &capabilities)
                    ));
                    changes.push(change("capabilities_needed", ChangeAction::Insert, None));
                }
            }
        }

        if let Some(tone) = populated(&request.tone_preference) {
            let sentence = format!("Your tone should be {}.", tone);
            match target(&regions, RegionKind::ToneIndicator) {
                Some(region) => {
                    let prefix = ListMarker::parse(region.text(text))
                        .map(|m| m.prefix(0))
                        .unwrap_or_default();
                    edits.push(Edit {
                        start: region.span.start,
                        end: region.span.end,
                        text: format!("{}{}", prefix, sentence),
                    });
                    changes.push(change("tone_preference", ChangeAction::Replace, Some(region)));
                }
                None => {
                    inserted.push(format!("{}\n{}", STYLE_HEADING, sentence));
                    changes.push(change("tone_preference", ChangeAction::Insert, None));
                }
            }
        }

        let constraints = populated_items(&request.constraints_to_add);
        if !constraints.is_empty() {
            match target(&regions, RegionKind::ConstraintBlock) {
                Some(region) => {
                    let (marker, offset) = last_marker(region.text(text));
                    edits.push(Edit {
                        start: region.span.end,
                        end: region.span.end,
                        text: format!("\n{}", render_list(&marker, offset, &constraints)),
                    });
                    changes.push(change(
                        "constraints_to_add",
                        ChangeAction::Append,
                        Some(region),
                    ));
                }
                None => {
                    inserted.push(format!(
                        "{}\n{}",
                        GUIDELINES_HEADING,
                        render_list(&ListMarker::default(), 0, &constraints)
                    ));
                    changes.push(change("constraints_to_add", ChangeAction::Insert, None));
                }
            }
        }

        if !inserted.is_empty() {
            edits.push(insertion(text, insert_at, role.is_some(), &inserted));
        }

        let mut trailing = Vec::new();
        for (field, heading, value) in [
            ("use_case", USE_CASE_HEADING, &request.use_case),
            ("output_format", OUTPUT_FORMAT_HEADING, &request.output_format),
            ("additional_context", CONTEXT_HEADING, &request.additional_context),
        ] {
            if let Some(value) = populated(value) {
                trailing.push(format!("{}\n{}", heading, value));
                changes.push(change(field, ChangeAction::TrailingSection, None));
            }
        }

        // zero-width insertions sort ahead of a replacement starting at the
        // same byte; a replacement ending there sorts ahead of the insertion
        edits.sort_by_key(|e| (e.start, e.end));
        Ok(Plan {
            edits,
            trailing,
            changes,
        })
    }
}

fn change(field: &'static str, action: ChangeAction, region: Option<&Region>) -> PlannedChange {
    PlannedChange {
        field,
        action,
        region: region.map(|r| r.kind),
        confidence: region.map(|r| r.confidence),
    }
}

/// Highest confidence region of `kind`, earliest on ties.
fn target(regions: &[Region], kind: RegionKind) -> Option<&Region> {
    regions
        .iter()
        .filter(|r| r.kind == kind)
        .fold(None, |best: Option<&Region>, r| match best {
            Some(b) if b.confidence >= r.confidence => Some(b),
            _ => Some(r),
        })
}

fn first_marker(block: &str) -> Option<ListMarker> {
    block.lines().find_map(ListMarker::parse)
}

/// Marker of the last list item in `block` and the offset the next item
/// takes from it. Prose blocks get a plain bullet.
fn last_marker(block: &str) -> (ListMarker, usize) {
    match block.lines().rev().find_map(ListMarker::parse) {
        Some(marker) => (marker, 1),
        None => (ListMarker::default(), 0),
    }
}

fn render_list(marker: &ListMarker, offset: usize, items: &[&str]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}{}", marker.prefix(offset + i), item))
        .collect::<Vec<_>>()
        .join("\n")
}

fn insertion(text: &str, at: usize, after_role: bool, blocks: &[String]) -> Edit {
    let body = blocks.join("\n\n");
    let rest = &text[at..];
    let insert = if after_role {
        // keep a blank line between the new blocks and whatever follows
        let followed_by_content =
            !rest.is_empty() && !rest.starts_with("\n\n") && !rest.starts_with("\r\n\r\n");
        format!("\n\n{}{}", body, if followed_by_content { "\n" } else { "" })
    } else if rest.trim().is_empty() {
        body
    } else {
        format!("{}\n\n", body)
    };
    Edit {
        start: at,
        end: at,
        text: insert,
    }
}

fn apply(base: &str, plan: &Plan) -> String {
    let mut out = String::with_capacity(base.len());
    let mut cursor = 0;
    for edit in &plan.edits {
        out.push_str(&base[cursor..edit.start]);
        out.push_str(&edit.text);
        cursor = edit.end;
    }
    out.push_str(&base[cursor..]);

    if plan.trailing.is_empty() {
        return out;
    }

    let ends_with_newline = out.ends_with('\n');
    let separator = if out.trim().is_empty() {
        ""
    } else if out.ends_with("\n\n") {
        ""
    } else if ends_with_newline {
        "\n"
    } else {
        "\n\n"
    };
    out.push_str(separator);
    out.push_str(&plan.trailing.join("\n\n"));
    if ends_with_newline {
        out.push('\n');
    }
    out
}

/// Build with the default detector.
pub fn build(request: &CustomizationRequest, base: &Document) -> Result<Document> {
    TemplateRewriter::default().build(request, base)
}

/// Render a plan the way the CLI prints `--preview`.
pub fn render_preview(base: &Document, changes: &[PlannedChange]) -> String {
    let mut out = format!("Customizing {}\n", base.label());
    for change in changes {
        out.push_str(&format!("{}\n", change));
    }
    out
}
