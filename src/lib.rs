pub mod compositor;
pub mod config;
pub mod error;
pub mod events;
pub mod schedule;
pub mod source;
pub mod surface;
pub mod transform;
pub mod processing {
    pub mod chroma_key;
    pub mod layout;
}
pub mod render {
    pub mod canvas;
}
pub mod tasks {
    pub mod pipeline;
}
