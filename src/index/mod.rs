pub mod resource;

pub use resource::IndexResource;
