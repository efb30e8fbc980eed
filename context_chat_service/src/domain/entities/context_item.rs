use uuid::Uuid;

pub type Embeddings = Vec<f32>;

/// Namespace of the ids derived from image filenames
const IMAGE_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a4e_93b7_4d0a_8f25_0c3e_5b9d_71a4);

/// Filename stored for an image uploaded without one
pub const DEFAULT_IMAGE_FILENAME: &str = "image";

/// An item of a user context collection, as written to the context store.
///
/// Items are never updated in place: writing an item with an existing id replaces it.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextItem {
    pub id: Uuid,
    pub embedding: Embeddings,
    pub payload: ContextItemPayload,
}

impl ContextItem {
    /// A text item gets a new random id on each write
    pub fn text(text: &str, embedding: Embeddings) -> Self {
        Self {
            id: Uuid::new_v4(),
            embedding,
            payload: ContextItemPayload::Text {
                text: text.to_string(),
            },
        }
    }

    /// An image item id is derived from its filename, so re-ingesting the same filename
    /// overwrites the previous item.
    ///
    /// Without a filename, the id is derived from the image content.
    pub fn image(
        filename: Option<&str>,
        content: &[u8],
        caption: &str,
        embedding: Embeddings,
    ) -> Self {
        let (id, filename) = match filename {
            Some(filename) => (image_id(filename.as_bytes()), filename.to_string()),
            None => (image_id(content), DEFAULT_IMAGE_FILENAME.to_string()),
        };

        Self {
            id,
            embedding,
            payload: ContextItemPayload::Image {
                filename,
                caption: caption.to_string(),
            },
        }
    }
}

fn image_id(name: &[u8]) -> Uuid {
    Uuid::new_v5(&IMAGE_ID_NAMESPACE, name)
}

/// Payload stored along the embedding
#[derive(Debug, Clone, PartialEq)]
pub enum ContextItemPayload {
    Text { text: String },
    Image { filename: String, caption: String },
}

impl ContextItemPayload {
    pub fn kind(&self) -> ContextItemKind {
        match self {
            ContextItemPayload::Text { .. } => ContextItemKind::Text,
            ContextItemPayload::Image { .. } => ContextItemKind::Image,
        }
    }

    /// Text contributed to a context block: the text itself, or the caption of an image
    pub fn context_text(&self) -> &str {
        match self {
            ContextItemPayload::Text { text } => text,
            ContextItemPayload::Image { caption, .. } => caption,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextItemKind {
    Text,
    Image,
}

impl ContextItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextItemKind::Text => "text",
            ContextItemKind::Image => "image",
        }
    }
}

/// An item read back from the context store.
///
/// `score` is only set by similarity queries, its meaning depends on the store metric.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredContextItem {
    pub id: Uuid,
    pub payload: ContextItemPayload,
    pub score: Option<f32>,
}
