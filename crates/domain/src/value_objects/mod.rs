pub mod table_name;

pub use table_name::TableName;
