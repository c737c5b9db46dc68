pub mod segment;
pub mod view;
pub mod writer;

pub use view::SearchView;
pub use writer::IndexWriter;
