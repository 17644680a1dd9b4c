//! Highlight creation flow
//!
//! Selection → anchored position → identity hash → store.

use tracing::{info, warn};

use super::store::HighlightStore;
use super::types::{HighlightDraft, HighlightRecord, HighlightUpdate, NewHighlight};
use crate::anchor;
use crate::capture::TextSelection;
use crate::error::{AppError, Result};
use crate::identity;
use crate::render::HighlightSegment;
use crate::tree::OrderedTree;

pub struct HighlightService<S> {
    store: S,
}

impl<S: HighlightStore> HighlightService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Anchors a captured selection, derives its identity hash and stores it
    pub async fn create_from_selection<T>(
        &self,
        tree: &T,
        root: T::Node,
        selection: &TextSelection<T::Node>,
        draft: HighlightDraft,
    ) -> Result<HighlightRecord>
    where
        T: OrderedTree + ?Sized,
    {
        let anchor = anchor::serialize(tree, root, selection, &draft.document_ref)
            .ok_or_else(|| AppError::Anchor("selection is outside the article container".into()))?;

        let hash = identity::generate_async(
            &anchor.document_ref,
            &anchor.text,
            anchor.start_offset,
            anchor.end_offset,
        )
        .await;

        let record = self
            .store
            .create(NewHighlight {
                article_id: draft.article_id,
                anchor,
                user_id: draft.user_id,
                user_name: draft.user_name,
                is_public: draft.is_public,
                note: draft.note,
                color: draft.color,
                highlight_hash: Some(hash),
            })
            .await
            .map_err(|e| {
                warn!(error = %e, "Highlight store rejected create");
                e
            })?;

        info!(id = %record.id, document_ref = %record.document_ref(), "Created highlight");
        Ok(record)
    }

    pub async fn update(&self, id: &str, update: &HighlightUpdate) -> Result<HighlightRecord> {
        if update.is_empty() {
            return Err(AppError::BadRequest("nothing to update".into()));
        }
        Ok(self.store.update(id, update).await?)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        if self.store.delete(id).await? {
            info!(id, "Deleted highlight");
            Ok(())
        } else {
            Err(AppError::NotFound(format!("highlight {id}")))
        }
    }

    pub async fn list_for_document(&self, document_ref: &str) -> Result<Vec<HighlightRecord>> {
        Ok(self.store.list(document_ref).await?)
    }

    /// Records of a document in the shape the renderer consumes
    pub async fn segments_for_document(&self, document_ref: &str) -> Result<Vec<HighlightSegment>> {
        let records = self.list_for_document(document_ref).await?;
        Ok(records.iter().map(HighlightRecord::segment).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{validate_text_selection, CaptureOptions};
    use crate::highlights::MemoryHighlightStore;
    use crate::render::{HighlightRenderer, RendererConfig};
    use crate::tree::{ContentTree, LiveRange};

    fn draft() -> HighlightDraft {
        HighlightDraft {
            article_id: "article-1".into(),
            document_ref: "my-first-article".into(),
            user_id: "reader".into(),
            user_name: Some("Reader".into()),
            ..HighlightDraft::default()
        }
    }

    #[tokio::test]
    async fn test_selection_to_rendered_highlight() {
        let mut tree = ContentTree::parse_xhtml("<article><p>The quick brown fox</p></article>").unwrap();
        let root = tree.root();
        let p = tree.child(root, 0).unwrap();
        let leaf = tree.child(p, 0).unwrap();
        let selection = validate_text_selection(
            &tree,
            root,
            LiveRange::new(leaf, 0, leaf, 19),
            &CaptureOptions::default(),
        )
        .unwrap();

        let service = HighlightService::new(MemoryHighlightStore::new());
        let record = service
            .create_from_selection(&tree, root, &selection, draft())
            .await
            .unwrap();
        assert_eq!(record.anchor.start_path, "0.0");
        assert_eq!(
            record.highlight_hash.as_ref().map(|h| h.as_str()),
            Some("6591d39ca9247edc371596edee97")
        );

        let segments = service.segments_for_document("my-first-article").await.unwrap();
        let mut renderer = HighlightRenderer::new(root, RendererConfig::default());
        let report = renderer.apply_highlights(&mut tree, &segments);
        assert_eq!(report.rendered, 1);
        assert_eq!(renderer.decorations()[0].id(), record.id);
    }

    #[tokio::test]
    async fn test_selection_outside_root_is_rejected() {
        let tree = ContentTree::parse_xhtml("<body><nav>Menu</nav><main>Text</main></body>").unwrap();
        let root = tree.root();
        let nav = tree.child(root, 0).unwrap();
        let main = tree.child(root, 1).unwrap();
        let menu = tree.child(nav, 0).unwrap();
        let selection = validate_text_selection(
            &tree,
            root,
            LiveRange::new(menu, 0, menu, 4),
            &CaptureOptions::default(),
        )
        .unwrap();

        let service = HighlightService::new(MemoryHighlightStore::new());
        let result = service.create_from_selection(&tree, main, &selection, draft()).await;
        assert!(matches!(result, Err(AppError::Anchor(_))));
        assert_eq!(service.store().len().await, 0);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let tree = ContentTree::parse_xhtml("<p>Some words here</p>").unwrap();
        let root = tree.root();
        let leaf = tree.child(root, 0).unwrap();
        let selection = validate_text_selection(
            &tree,
            root,
            LiveRange::new(leaf, 5, leaf, 10),
            &CaptureOptions::default(),
        )
        .unwrap();
        let service = HighlightService::new(MemoryHighlightStore::new());
        let record = service
            .create_from_selection(&tree, root, &selection, draft())
            .await
            .unwrap();

        assert!(matches!(
            service.update(&record.id, &HighlightUpdate::default()).await,
            Err(AppError::BadRequest(_))
        ));
        let updated = service
            .update(
                &record.id,
                &HighlightUpdate {
                    color: Some("#00FF00".into()),
                    ..HighlightUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.color, "#00FF00");
        assert_eq!(updated.highlight_hash, record.highlight_hash);

        service.delete(&record.id).await.unwrap();
        assert!(matches!(
            service.delete(&record.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
