//! Tree queries the article heuristics need, independent of the HTML parser.

use scraper::{ElementRef, Html, Selector};

pub trait MarkupTree {
    type Node<'a>: Copy
    where
        Self: 'a;

    /// Detach every element with one of `tags`, children included.
    fn remove_elements(&mut self, tags: &[&str]);

    fn title(&self) -> Option<String>;

    fn first_by_tag(&self, tag: &str) -> Option<Self::Node<'_>>;

    fn first_by_attr(
        &self,
        tag: &str,
        attr: &str,
        pred: &dyn Fn(&str) -> bool,
    ) -> Option<Self::Node<'_>>;

    /// All elements with `tag`, in document order.
    fn all_by_tag(&self, tag: &str) -> Vec<Self::Node<'_>>;

    fn count_descendants<'a>(&'a self, node: Self::Node<'a>, tag: &str) -> usize;

    /// Stripped text nodes under `node`, one per line.
    fn text<'a>(&'a self, node: Self::Node<'a>) -> String;
}

pub struct HtmlTree {
    doc: Html,
}

impl HtmlTree {
    pub fn parse(html: &str) -> Self {
        Self {
            doc: Html::parse_document(html),
        }
    }

    // Queries go through the root element so detached subtrees stay invisible.
    fn select(&self, css: &str) -> Vec<ElementRef<'_>> {
        match Selector::parse(css) {
            Ok(sel) => self.doc.root_element().select(&sel).collect(),
            Err(_) => Vec::new(),
        }
    }
}

impl MarkupTree for HtmlTree {
    type Node<'a> = ElementRef<'a>;

    fn remove_elements(&mut self, tags: &[&str]) {
        let ids: Vec<_> = self
            .select(&tags.join(", "))
            .into_iter()
            .map(|el| el.id())
            .collect();
        for id in ids {
            if let Some(mut node) = self.doc.tree.get_mut(id) {
                node.detach();
            }
        }
    }

    fn title(&self) -> Option<String> {
        self.select("title")
            .first()
            .map(|el| el.text().collect::<String>().trim().to_string())
    }

    fn first_by_tag(&self, tag: &str) -> Option<ElementRef<'_>> {
        self.select(tag).into_iter().next()
    }

    fn first_by_attr(
        &self,
        tag: &str,
        attr: &str,
        pred: &dyn Fn(&str) -> bool,
    ) -> Option<ElementRef<'_>> {
        self.select(tag)
            .into_iter()
            .find(|el| el.value().attr(attr).is_some_and(pred))
    }

    fn all_by_tag(&self, tag: &str) -> Vec<ElementRef<'_>> {
        self.select(tag)
    }

    fn count_descendants<'a>(&'a self, node: ElementRef<'a>, tag: &str) -> usize {
        match Selector::parse(tag) {
            Ok(sel) => node.select(&sel).count(),
            Err(_) => 0,
        }
    }

    fn text<'a>(&'a self, node: ElementRef<'a>) -> String {
        node.text()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removed_elements_disappear_from_queries_and_text() {
        let mut tree = HtmlTree::parse(
            "<html><body><nav><p>menu</p></nav><div><p>kept</p><script>var x;</script></div></body></html>",
        );
        tree.remove_elements(&["nav", "script"]);

        assert!(tree.first_by_tag("nav").is_none());
        let body = tree.first_by_tag("body").unwrap();
        assert_eq!(tree.text(body), "kept");
        assert_eq!(tree.count_descendants(body, "p"), 1);
    }

    #[test]
    fn attribute_predicate_matches_first_element() {
        let tree = HtmlTree::parse(
            r#"<div class="sidebar">a</div><div class="Post-Body">b</div><div class="post">c</div>"#,
        );
        let pred = |v: &str| v.to_lowercase().contains("post");
        let el = tree.first_by_attr("div", "class", &pred).unwrap();
        assert_eq!(tree.text(el), "b");
    }

    #[test]
    fn title_is_trimmed() {
        let tree = HtmlTree::parse("<html><head><title>  Hello  </title></head></html>");
        assert_eq!(tree.title().as_deref(), Some("Hello"));
    }
}
