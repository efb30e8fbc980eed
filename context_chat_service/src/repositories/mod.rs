pub mod context_item_in_memory_repository;
pub mod context_item_qdrant_repository;
