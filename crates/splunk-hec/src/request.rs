// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Ordered batch of documents sent in a single HEC exchange.

use crate::document::Document;

/// Documents are serialized in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    pub items: Vec<Document>,
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: Document) -> Self {
        Self {
            items: vec![document],
        }
    }

    pub fn from_documents<I>(documents: I) -> Self
    where
        I: IntoIterator<Item = Document>,
    {
        Self {
            items: documents.into_iter().collect(),
        }
    }

    pub fn push(&mut self, document: Document) {
        self.items.push(document);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Newline-delimited JSON body: one document per line, no trailing newline.
    pub fn serialize(&self) -> String {
        let mut body = String::new();
        for document in &self.items {
            body.push_str(&document.serialize());
            body.push('\n');
        }
        body.truncate(body.trim_end_matches(['\r', '\n']).len());
        body
    }
}

impl From<Vec<Document>> for Request {
    fn from(items: Vec<Document>) -> Self {
        Self { items }
    }
}

impl FromIterator<Document> for Request {
    fn from_iter<I: IntoIterator<Item = Document>>(iter: I) -> Self {
        Self::from_documents(iter)
    }
}

impl Extend<Document> for Request {
    fn extend<I: IntoIterator<Item = Document>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn doc(time: i64) -> Document {
        Document {
            time,
            ..Default::default()
        }
    }

    #[test]
    fn empty_request_serializes_to_empty_string() {
        assert_eq!(Request::new().serialize(), "");
        assert!(Request::new().is_empty());
    }

    #[test]
    fn single_document_has_no_trailing_newline() {
        let request = Request::with_document(doc(1));
        assert_eq!(request.serialize(), r#"{"time":1}"#);
    }

    #[test]
    fn documents_are_joined_in_insertion_order() {
        let mut request = Request::from_documents(vec![doc(3), doc(1)]);
        request.push(doc(2));

        assert_eq!(request.len(), 3);
        assert_eq!(
            request.serialize(),
            "{\"time\":3}\n{\"time\":1}\n{\"time\":2}"
        );
    }

    #[test]
    fn collect_and_extend_build_requests() {
        let mut request: Request = (1..=2).map(doc).collect();
        request.extend(vec![doc(9)]);
        assert_eq!(request, Request::from(vec![doc(1), doc(2), doc(9)]));
    }

    proptest! {
        #[test]
        fn serialize_has_one_line_per_document(times in proptest::collection::vec(any::<i64>(), 1..32)) {
            let request: Request = times.iter().copied().map(doc).collect();
            let body = request.serialize();

            prop_assert!(!body.ends_with('\n'));
            let lines: Vec<&str> = body.split('\n').collect();
            prop_assert_eq!(lines.len(), times.len());
            for (line, time) in lines.iter().zip(&times) {
                prop_assert_eq!(*line, format!("{{\"time\":{time}}}"));
            }
        }
    }
}
