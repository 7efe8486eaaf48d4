//! Request bodies and response parsing for the legacy Trading API
//! (`GetCategories`, `GetSuggestedCategories`).
//!
//! The Trading API speaks XML. Responses carry an `<Ack>` status and zero or
//! more `<Errors>` blocks; a `Failure` ack is surfaced as [`EbayError::Api`].

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::EbayError;
use crate::types::{SuggestedCategory, TradingCategory};

const EBAY_NS: &str = "urn:ebay:apis:eBLBaseComponents";

/// Builds a `GetCategories` request for the node `parent_id` (or the top
/// level when `None`), including every descendant down to `level_limit`.
pub(crate) fn get_categories_request(
    site_id: u32,
    parent_id: Option<&str>,
    level_limit: Option<u32>,
) -> String {
    let mut body = format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\
         <GetCategoriesRequest xmlns=\"{EBAY_NS}\">\
         <CategorySiteID>{site_id}</CategorySiteID>"
    );
    if let Some(parent) = parent_id {
        body.push_str(&format!("<CategoryParent>{}</CategoryParent>", escape(parent)));
    }
    if let Some(limit) = level_limit {
        body.push_str(&format!("<LevelLimit>{limit}</LevelLimit>"));
    }
    body.push_str(
        "<DetailLevel>ReturnAll</DetailLevel>\
         <ViewAllNodes>true</ViewAllNodes>\
         </GetCategoriesRequest>",
    );
    body
}

pub(crate) fn get_suggested_categories_request(query: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\
         <GetSuggestedCategoriesRequest xmlns=\"{EBAY_NS}\">\
         <Query>{}</Query>\
         </GetSuggestedCategoriesRequest>",
        escape(query)
    )
}

/// Parses a `GetCategoriesResponse` into its category array.
pub(crate) fn parse_get_categories(xml: &str) -> Result<Vec<TradingCategory>, EbayError> {
    let mut ack = AckStatus::default();
    let mut categories = Vec::new();
    let mut current: Option<TradingCategory> = None;

    walk(xml, "GetCategories", |stack, node| {
        ack.observe(stack, &node);
        match node {
            Node::Open("Category") if parent_of(stack) == Some("CategoryArray") => {
                current = Some(TradingCategory::default());
            }
            Node::Close("Category") => {
                if let Some(mut category) = current.take() {
                    if category.parent_id.as_deref() == Some(category.category_id.as_str()) {
                        category.parent_id = None;
                    }
                    categories.push(category);
                }
            }
            Node::Text(text) if parent_of(stack) == Some("Category") => {
                if let Some(category) = current.as_mut() {
                    match stack.last().map(String::as_str) {
                        Some("CategoryID") => category.category_id = text.to_string(),
                        Some("CategoryName") => category.category_name = text.to_string(),
                        Some("CategoryParentID") if category.parent_id.is_none() => {
                            category.parent_id = Some(text.to_string());
                        }
                        Some("CategoryLevel") => category.level = text.parse().unwrap_or(0),
                        Some("LeafCategory") => category.leaf = text == "true",
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    })?;

    ack.into_result("GetCategories")?;
    Ok(categories)
}

/// Parses a `GetSuggestedCategoriesResponse`, preserving eBay's ranking.
pub(crate) fn parse_suggested_categories(xml: &str) -> Result<Vec<SuggestedCategory>, EbayError> {
    let mut ack = AckStatus::default();
    let mut suggestions = Vec::new();
    let mut current: Option<SuggestedCategory> = None;

    walk(xml, "GetSuggestedCategories", |stack, node| {
        ack.observe(stack, &node);
        match node {
            Node::Open("SuggestedCategory") => current = Some(SuggestedCategory::default()),
            Node::Close("SuggestedCategory") => {
                if let Some(suggestion) = current.take() {
                    suggestions.push(suggestion);
                }
            }
            Node::Text(text) => {
                let Some(suggestion) = current.as_mut() else {
                    return;
                };
                match (parent_of(stack), stack.last().map(String::as_str)) {
                    (Some("Category"), Some("CategoryID")) => {
                        suggestion.category_id = text.to_string();
                    }
                    (Some("Category"), Some("CategoryName")) => {
                        suggestion.category_name = text.to_string();
                    }
                    (Some("Category"), Some("CategoryParentID")) => {
                        suggestion.parent_ids.push(text.to_string());
                    }
                    (Some("Category"), Some("CategoryParentName")) => {
                        suggestion.parent_names.push(text.to_string());
                    }
                    (Some("Category"), Some("LeafCategory")) => {
                        suggestion.leaf = Some(text == "true");
                    }
                    (Some("SuggestedCategory"), Some("PercentItemFound")) => {
                        suggestion.percent_item_found = text.parse().ok();
                    }
                    _ => {}
                }
            }
            Node::Open(_) | Node::Close(_) => {}
        }
    })?;

    ack.into_result("GetSuggestedCategories")?;
    Ok(suggestions)
}

enum Node<'a> {
    Open(&'a str),
    Close(&'a str),
    Text(&'a str),
}

fn parent_of(stack: &[String]) -> Option<&str> {
    stack
        .len()
        .checked_sub(2)
        .and_then(|i| stack.get(i))
        .map(String::as_str)
}

/// Streams `xml`, calling `visit` with the open-element stack (local names,
/// namespace prefixes dropped) for every open, close and text event.
fn walk(
    xml: &str,
    context: &str,
    mut visit: impl FnMut(&[String], Node<'_>),
) -> Result<(), EbayError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let xml_error = |source: quick_xml::Error| EbayError::Xml {
        context: context.to_string(),
        source,
    };

    let mut stack: Vec<String> = Vec::new();
    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                stack.push(name.clone());
                visit(&stack, Node::Open(&name));
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                stack.push(name.clone());
                visit(&stack, Node::Open(&name));
                visit(&stack, Node::Close(&name));
                stack.pop();
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                visit(&stack, Node::Close(&name));
                stack.pop();
            }
            Event::Text(e) => {
                let text = e.unescape().map_err(xml_error)?;
                visit(&stack, Node::Text(&text));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(())
}

/// `<Ack>` plus any `<Errors>` blocks of a Trading API response.
#[derive(Debug, Default)]
struct AckStatus {
    ack: Option<String>,
    errors: Vec<ApiMessage>,
}

#[derive(Debug, Default)]
struct ApiMessage {
    short: String,
    long: String,
    severity: String,
}

impl AckStatus {
    fn observe(&mut self, stack: &[String], node: &Node<'_>) {
        // Only top-level envelope fields: Response > Ack, Response > Errors > *.
        match node {
            Node::Open("Errors") if stack.len() == 2 => self.errors.push(ApiMessage::default()),
            Node::Text(text) if stack.len() == 2 && stack[1] == "Ack" => {
                self.ack = Some((*text).to_string());
            }
            Node::Text(text) if stack.len() == 3 && stack[1] == "Errors" => {
                if let Some(message) = self.errors.last_mut() {
                    match stack[2].as_str() {
                        "ShortMessage" => message.short = (*text).to_string(),
                        "LongMessage" => message.long = (*text).to_string(),
                        "SeverityCode" => message.severity = (*text).to_string(),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    fn into_result(self, call: &str) -> Result<(), EbayError> {
        let describe = |m: &ApiMessage| {
            if m.long.is_empty() {
                m.short.clone()
            } else {
                m.long.clone()
            }
        };

        for warning in self.errors.iter().filter(|m| m.severity == "Warning") {
            tracing::warn!(call, message = %describe(warning), "eBay API warning");
        }

        if self.ack.as_deref() == Some("Failure") {
            let message = self
                .errors
                .iter()
                .filter(|m| m.severity != "Warning")
                .map(describe)
                .filter(|m| !m.is_empty())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(EbayError::Api {
                call: call.to_string(),
                message: if message.is_empty() {
                    "unknown error".to_string()
                } else {
                    message
                },
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GET_CATEGORIES_OK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<GetCategoriesResponse xmlns="urn:ebay:apis:eBLBaseComponents">
  <Timestamp>2026-10-01T03:00:00.000Z</Timestamp>
  <Ack>Success</Ack>
  <CategoryArray>
    <Category>
      <BestOfferEnabled>true</BestOfferEnabled>
      <CategoryID>6028</CategoryID>
      <CategoryLevel>2</CategoryLevel>
      <CategoryName>Parts &amp; Accessories</CategoryName>
      <CategoryParentID>6000</CategoryParentID>
    </Category>
    <Category>
      <CategoryID>33615</CategoryID>
      <CategoryLevel>3</CategoryLevel>
      <CategoryName>Brakes</CategoryName>
      <CategoryParentID>6028</CategoryParentID>
      <LeafCategory>true</LeafCategory>
    </Category>
    <Category>
      <CategoryID>6000</CategoryID>
      <CategoryLevel>1</CategoryLevel>
      <CategoryName>eBay Motors</CategoryName>
      <CategoryParentID>6000</CategoryParentID>
    </Category>
  </CategoryArray>
  <CategoryCount>3</CategoryCount>
</GetCategoriesResponse>"#;

    const SUGGESTED_OK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<GetSuggestedCategoriesResponse xmlns="urn:ebay:apis:eBLBaseComponents">
  <Ack>Success</Ack>
  <SuggestedCategoryArray>
    <SuggestedCategory>
      <Category>
        <CategoryID>33615</CategoryID>
        <CategoryName>Brakes</CategoryName>
        <CategoryParentID>6000</CategoryParentID>
        <CategoryParentID>6028</CategoryParentID>
        <CategoryParentName>eBay Motors</CategoryParentName>
        <CategoryParentName>Parts &amp; Accessories</CategoryParentName>
      </Category>
      <PercentItemFound>71</PercentItemFound>
    </SuggestedCategory>
    <SuggestedCategory>
      <Category>
        <CategoryID>1249</CategoryID>
        <CategoryName>Everything Else</CategoryName>
      </Category>
      <PercentItemFound>4</PercentItemFound>
    </SuggestedCategory>
  </SuggestedCategoryArray>
  <CategoryCount>2</CategoryCount>
</GetSuggestedCategoriesResponse>"#;

    #[test]
    fn get_categories_request_includes_parent_and_escapes() {
        let body = get_categories_request(0, Some("6000"), Some(2));
        assert!(body.contains("<CategorySiteID>0</CategorySiteID>"));
        assert!(body.contains("<CategoryParent>6000</CategoryParent>"));
        assert!(body.contains("<LevelLimit>2</LevelLimit>"));
        assert!(body.contains("<DetailLevel>ReturnAll</DetailLevel>"));

        let top = get_categories_request(3, None, None);
        assert!(!top.contains("CategoryParent>"));
        assert!(!top.contains("LevelLimit"));
    }

    #[test]
    fn suggested_request_escapes_query() {
        let body = get_suggested_categories_request("Brake pads <front> & rotors");
        assert!(body.contains("<Query>Brake pads &lt;front&gt; &amp; rotors</Query>"));
    }

    #[test]
    fn parses_category_array() {
        let categories = parse_get_categories(GET_CATEGORIES_OK).expect("parse");
        assert_eq!(categories.len(), 3);

        assert_eq!(categories[0].category_id, "6028");
        assert_eq!(categories[0].category_name, "Parts & Accessories");
        assert_eq!(categories[0].parent_id.as_deref(), Some("6000"));
        assert_eq!(categories[0].level, 2);
        assert!(!categories[0].leaf);

        assert!(categories[1].leaf);
    }

    #[test]
    fn top_level_category_has_no_parent() {
        let categories = parse_get_categories(GET_CATEGORIES_OK).expect("parse");
        let root = categories
            .iter()
            .find(|c| c.category_id == "6000")
            .expect("root present");
        assert!(root.parent_id.is_none());
    }

    #[test]
    fn parses_suggestions_in_rank_order() {
        let suggestions = parse_suggested_categories(SUGGESTED_OK).expect("parse");
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].category_id, "33615");
        assert_eq!(
            suggestions[0].parent_names,
            vec!["eBay Motors", "Parts & Accessories"]
        );
        assert_eq!(suggestions[0].parent_ids, vec!["6000", "6028"]);
        assert_eq!(suggestions[0].percent_item_found, Some(71));
        assert!(suggestions[1].parent_names.is_empty());
    }

    #[test]
    fn suggestion_reads_leaf_flag() {
        let xml = r#"<GetSuggestedCategoriesResponse xmlns="urn:ebay:apis:eBLBaseComponents">
            <Ack>Success</Ack>
            <SuggestedCategoryArray>
              <SuggestedCategory>
                <Category>
                  <CategoryID>6028</CategoryID>
                  <CategoryName>Parts &amp; Accessories</CategoryName>
                  <CategoryParentID>6000</CategoryParentID>
                  <CategoryParentName>eBay Motors</CategoryParentName>
                  <LeafCategory>false</LeafCategory>
                </Category>
                <PercentItemFound>40</PercentItemFound>
              </SuggestedCategory>
              <SuggestedCategory>
                <Category>
                  <CategoryID>33615</CategoryID>
                  <CategoryName>Brakes</CategoryName>
                  <LeafCategory>true</LeafCategory>
                </Category>
              </SuggestedCategory>
            </SuggestedCategoryArray>
        </GetSuggestedCategoriesResponse>"#;
        let suggestions = parse_suggested_categories(xml).expect("parse");
        assert_eq!(suggestions[0].leaf, Some(false));
        assert_eq!(suggestions[1].leaf, Some(true));

        let info = suggestions[0].clone().into_info();
        assert!(!info.leaf);
        assert_eq!(info.path, vec!["eBay Motors", "Parts & Accessories"]);
    }

    #[test]
    fn empty_suggestion_list_is_ok() {
        let xml = r#"<GetSuggestedCategoriesResponse xmlns="urn:ebay:apis:eBLBaseComponents">
            <Ack>Success</Ack><CategoryCount>0</CategoryCount>
        </GetSuggestedCategoriesResponse>"#;
        assert!(parse_suggested_categories(xml).expect("parse").is_empty());
    }

    #[test]
    fn failure_ack_becomes_api_error() {
        let xml = r#"<GetCategoriesResponse xmlns="urn:ebay:apis:eBLBaseComponents">
            <Ack>Failure</Ack>
            <Errors>
              <ShortMessage>Invalid category.</ShortMessage>
              <LongMessage>The category ID 999 is not valid.</LongMessage>
              <ErrorCode>37</ErrorCode>
              <SeverityCode>Error</SeverityCode>
            </Errors>
        </GetCategoriesResponse>"#;
        let err = parse_get_categories(xml).unwrap_err();
        match err {
            EbayError::Api { call, message } => {
                assert_eq!(call, "GetCategories");
                assert_eq!(message, "The category ID 999 is not valid.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn warning_ack_still_returns_data() {
        let xml = r#"<GetSuggestedCategoriesResponse xmlns="urn:ebay:apis:eBLBaseComponents">
            <Ack>Warning</Ack>
            <Errors>
              <ShortMessage>Deprecated call.</ShortMessage>
              <SeverityCode>Warning</SeverityCode>
            </Errors>
            <SuggestedCategoryArray>
              <SuggestedCategory>
                <Category><CategoryID>1249</CategoryID><CategoryName>Everything Else</CategoryName></Category>
              </SuggestedCategory>
            </SuggestedCategoryArray>
        </GetSuggestedCategoriesResponse>"#;
        let suggestions = parse_suggested_categories(xml).expect("parse");
        assert_eq!(suggestions.len(), 1);
    }

    #[test]
    fn malformed_xml_is_an_xml_error() {
        let xml = "<GetCategoriesResponse><Ack>Success</Ack></Mismatched>";
        let err = parse_get_categories(xml).unwrap_err();
        assert!(matches!(err, EbayError::Xml { .. }));
    }
}
