//! Element actions addressed by mmid.
//!
//! Every action resolves its identifier against the live page first: the
//! `mmid` attribute must match exactly one element right now, not just in
//! the snapshot the planner read it from. Stale or duplicated identifiers
//! fail loudly instead of clicking the wrong thing.

use eoka::Page;

use crate::credentials::{self, CredentialSource};
use crate::error::{Error, Result};

/// Build the attribute selector for an identifier. Identifiers are decimal
/// strings straight from the allocator, so anything else is rejected before
/// it can reach a selector.
fn mmid_selector(mmid: &str) -> Result<String> {
    if mmid.is_empty() || !mmid.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidMmid(mmid.to_string()));
    }
    Ok(format!("[mmid=\"{}\"]", mmid))
}

/// Resolve an mmid to a selector that matches exactly one live element.
async fn locate(page: &Page, mmid: &str) -> Result<String> {
    let selector = mmid_selector(mmid)?;
    let quoted = serde_json::to_string(&selector).unwrap();
    let script = format!("document.querySelectorAll({}).length", quoted);
    let count: u64 = page.evaluate(&script).await?;
    match count {
        0 => Err(Error::MmidNotFound(mmid.to_string())),
        1 => Ok(selector),
        n => Err(Error::MmidAmbiguous {
            mmid: mmid.to_string(),
            count: n as usize,
        }),
    }
}

/// Click the element tagged with `mmid`, optionally pausing first to let
/// late-settling pages finish rendering.
pub(crate) async fn click(page: &Page, mmid: &str, wait_before_ms: u64) -> Result<()> {
    if wait_before_ms > 0 {
        page.wait(wait_before_ms).await;
    }
    let selector = locate(page, mmid).await?;
    tracing::debug!("clicking {}", selector);
    page.click(&selector).await?;
    Ok(())
}

/// Fill the element tagged with `mmid`. Credential placeholders resolve to
/// their configured values here, at the last moment before the fill.
pub(crate) async fn fill(
    page: &Page,
    mmid: &str,
    content: &str,
    source: &dyn CredentialSource,
) -> Result<()> {
    let resolved = credentials::resolve(content, source)?;
    let selector = locate(page, mmid).await?;
    tracing::debug!("filling {}", selector);
    page.fill(&selector, &resolved).await?;
    Ok(())
}

/// Fill one element, then click another, as a single compound step for
/// search-and-submit style interactions. The fill text is taken literally
/// with no placeholder substitution. If the fill succeeded but the click
/// did not, the error says so, because the page is now half-modified.
pub(crate) async fn fill_then_click(
    page: &Page,
    text_mmid: &str,
    text: &str,
    click_mmid: &str,
    wait_before_click_ms: u64,
) -> Result<()> {
    let text_selector = locate(page, text_mmid).await?;
    page.fill(&text_selector, text).await?;

    if wait_before_click_ms > 0 {
        page.wait(wait_before_click_ms).await;
    }
    let click_result: Result<()> = async {
        let selector = locate(page, click_mmid).await?;
        page.click(&selector).await?;
        Ok(())
    }
    .await;
    click_result.map_err(|source| Error::CompoundClick {
        text_mmid: text_mmid.to_string(),
        click_mmid: click_mmid.to_string(),
        source: Box::new(source),
    })
}

/// Press Enter in the currently focused element.
pub(crate) async fn press_enter(page: &Page) -> Result<()> {
    page.human().press_key("Enter").await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_for_numeric_identifier() {
        assert_eq!(mmid_selector("42").unwrap(), r#"[mmid="42"]"#);
    }

    #[test]
    fn rejects_empty_identifier() {
        assert!(matches!(
            mmid_selector("").unwrap_err(),
            Error::InvalidMmid(_)
        ));
    }

    #[test]
    fn rejects_non_numeric_identifiers() {
        for bad in ["abc", "1a", "-1", "1.5", " 7", r#"1"]"#] {
            assert!(
                matches!(mmid_selector(bad), Err(Error::InvalidMmid(_))),
                "accepted {:?}",
                bad
            );
        }
    }
}
