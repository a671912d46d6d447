use anyhow::Result;

use crate::cli::{resolve_document, Workspace};
use crate::regions::{Region, RegionDetector};
use crate::util::truncate_chars;

const PREVIEW_CHARS: usize = 70;

fn line_number(text: &str, offset: usize) -> usize {
    text[..offset].matches('\n').count() + 1
}

pub fn render(text: &str, regions: &[Region]) -> String {
    if regions.is_empty() {
        return "No regions detected\n".to_string();
    }
    let mut out = String::new();
    for region in regions {
        let first = line_number(text, region.span.start);
        let last = line_number(text, region.span.end);
        let excerpt = region.text(text).lines().next().unwrap_or("").trim();
        out.push_str(&format!(
            "{:<17} {:<6} lines {}-{}  {}\n",
            region.kind.as_str(),
            region.confidence.to_string(),
            first,
            last,
            truncate_chars(excerpt, PREVIEW_CHARS)
        ));
    }
    out
}

pub fn run(
    workspace: &Workspace,
    identity: Option<String>,
    file: Option<String>,
    json: bool,
) -> Result<()> {
    let doc = resolve_document(workspace, identity.as_deref(), file.as_deref())?;
    let regions = RegionDetector::default().detect(doc.text());

    if json {
        println!("{}", serde_json::to_string_pretty(&regions)?);
    } else {
        println!("Regions in {}:", doc.label());
        print!("{}", render(doc.text(), &regions));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regions::detect_regions;

    #[test]
    fn test_render_reports_line_ranges() {
        let text = "You are Helper, a general assistant.\n- Answer questions\n- Write code\n- Search the web\n- Summarize documents";
        let regions = detect_regions(text);
        let rendered = render(text, &regions);
        assert!(rendered.contains("role-statement"));
        assert!(rendered.contains("lines 1-1"));
        assert!(rendered.contains("capability-block"));
        assert!(rendered.contains("lines 2-5"));
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render("", &[]), "No regions detected\n");
    }
}
