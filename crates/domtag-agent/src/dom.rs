//! DOM reduction: tag actionable elements in the live page and return a
//! compact tree a language model can reason over.
//!
//! The reducer runs as injected JavaScript in a single pass. Elements that
//! are interactive, or carry visible text of their own, receive an `mmid`
//! attribute drawn from the session counter; structural containers survive
//! untagged when they hold relevant descendants; everything else is dropped.
//! Identifiers are assigned in document order, so the serialized tree reads
//! top to bottom in increasing mmid order.

use serde::{Deserialize, Serialize};

use crate::allocator::MmidCounter;
use crate::error::{Error, Result};

/// In-page tagging pass. Takes the counter seed, stamps `mmid` attributes,
/// and returns the reduced tree plus the advanced counter as JSON.
const REDUCE_JS: &str = r#"((seed) => {
    const SKIP = new Set(['script', 'style', 'noscript', 'template', 'meta',
        'link', 'base', 'title', 'svg', 'iframe', 'object', 'embed']);
    const INTERACTIVE_TAGS = new Set(['a', 'button', 'input', 'select',
        'textarea', 'option', 'label', 'summary', 'details']);
    const INTERACTIVE_ROLES = new Set(['button', 'link', 'tab', 'menuitem',
        'checkbox', 'radio', 'option', 'switch', 'combobox', 'searchbox',
        'textbox', 'slider', 'spinbutton']);
    const ATTR_KEYS = ['role', 'name', 'type', 'placeholder', 'href'];
    const TEXT_CAP = 120;
    let counter = seed;

    function isHidden(el) {
        if (el.hidden) return true;
        const style = getComputedStyle(el);
        if (style.display === 'none' || style.visibility === 'hidden') return true;
        if (parseFloat(style.opacity) < 0.1) return true;
        return false;
    }

    function ownText(el) {
        let text = '';
        for (const child of el.childNodes) {
            if (child.nodeType === Node.TEXT_NODE) text += child.textContent;
        }
        text = text.replace(/\s+/g, ' ').trim();
        if (text.length > TEXT_CAP) text = text.slice(0, TEXT_CAP - 3) + '...';
        return text;
    }

    function isInteractive(el, tag) {
        if (INTERACTIVE_TAGS.has(tag)) return true;
        const role = el.getAttribute('role');
        if (role && INTERACTIVE_ROLES.has(role.toLowerCase())) return true;
        if (el.hasAttribute('onclick')) return true;
        if (el.isContentEditable) return true;
        return false;
    }

    function pickAttrs(el) {
        const out = {};
        for (const key of ATTR_KEYS) {
            const value = el.getAttribute(key);
            if (value) out[key] = value;
        }
        const aria = el.getAttribute('aria-label');
        if (aria) out.aria_label = aria;
        return out;
    }

    function reduce(el) {
        const tag = el.tagName.toLowerCase();
        if (SKIP.has(tag)) return null;
        if (isHidden(el)) return null;

        const text = ownText(el);
        const relevant = isInteractive(el, tag) || text.length > 0;
        const node = { tag: tag, text: text, children: [] };

        if (relevant) {
            const mmid = String(counter);
            counter += 1;
            el.setAttribute('mmid', mmid);
            node.mmid = mmid;
            const attrs = pickAttrs(el);
            if (Object.keys(attrs).length > 0) node.attrs = attrs;
        }

        for (const child of el.children) {
            const reduced = reduce(child);
            if (reduced !== null) node.children.push(reduced);
        }

        if (!relevant && node.children.length === 0) return null;
        return node;
    }

    const body = document.body;
    const root = body ? reduce(body) : null;
    return JSON.stringify({
        root: root || { tag: 'body', text: '', children: [] },
        mmidCounter: counter,
    });
})"#;

/// Attributes surfaced for tagged elements. Only non-empty values are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeAttrs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aria_label: Option<String>,
}

impl NodeAttrs {
    pub fn is_empty(&self) -> bool {
        self.role.is_none()
            && self.name.is_none()
            && self.input_type.is_none()
            && self.placeholder.is_none()
            && self.href.is_none()
            && self.aria_label.is_none()
    }
}

/// One node of the reduced page tree. Tagged nodes carry an `mmid`;
/// structural containers kept for context do not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomNode {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mmid: Option<String>,
    #[serde(default, skip_serializing_if = "NodeAttrs::is_empty")]
    pub attrs: NodeAttrs,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DomNode>,
}

impl DomNode {
    /// Find a node by its mmid anywhere in the tree.
    pub fn find(&self, mmid: &str) -> Option<&DomNode> {
        if self.mmid.as_deref() == Some(mmid) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(mmid))
    }

    /// Number of tagged nodes in the tree.
    pub fn tagged_count(&self) -> usize {
        let own = usize::from(self.mmid.is_some());
        own + self
            .children
            .iter()
            .map(DomNode::tagged_count)
            .sum::<usize>()
    }

    /// Structural equality that ignores identifier values. Two reductions
    /// of the same unchanged page match in shape even though their mmids
    /// came from different counter ranges.
    pub fn matches_shape(&self, other: &DomNode) -> bool {
        self.tag == other.tag
            && self.text == other.text
            && self.attrs == other.attrs
            && self.mmid.is_some() == other.mmid.is_some()
            && self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .zip(&other.children)
                .all(|(a, b)| a.matches_shape(b))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReduction {
    root: DomNode,
    mmid_counter: u64,
}

/// Run the tagging pass against the current page. Returns the reduced tree
/// and the advanced counter value. The caller owns committing that value
/// back into the session allocator.
pub(crate) async fn reduce(page: &eoka::Page, seed: u64) -> Result<(DomNode, u64)> {
    let script = format!("{}({})", REDUCE_JS, seed);
    let raw: String = page.evaluate(&script).await?;
    let reduction: RawReduction = serde_json::from_str(&raw)
        .map_err(|e| Error::Snapshot(format!("unparseable reducer output: {}", e)))?;
    verify(&reduction.root, seed, reduction.mmid_counter)?;
    Ok((reduction.root, reduction.mmid_counter))
}

/// Replay the allocation sequence over the returned tree: every tagged node,
/// visited in document order, must carry exactly the identifier a counter
/// seeded the same way would hand out, and the reported final value must
/// account for every allocation. Catches duplicate, out-of-order and
/// fabricated identifiers in one walk.
fn verify(root: &DomNode, seed: u64, returned: u64) -> Result<()> {
    let mut counter = MmidCounter::seeded(seed);
    replay(root, &mut counter)?;
    if counter.seed() != returned {
        return Err(Error::Snapshot(format!(
            "reducer reported counter {} but tagging consumed through {}",
            returned,
            counter.seed()
        )));
    }
    Ok(())
}

fn replay(node: &DomNode, counter: &mut MmidCounter) -> Result<()> {
    if let Some(mmid) = &node.mmid {
        let expected = counter.next();
        if *mmid != expected {
            return Err(Error::Snapshot(format!(
                "identifier \"{}\" out of sequence, expected \"{}\"",
                mmid, expected
            )));
        }
    }
    for child in &node.children {
        replay(child, counter)?;
    }
    Ok(())
}
