mod cors;
mod embed_context;
mod health_check;
mod helpers;
mod prompt;
