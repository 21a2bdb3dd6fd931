//! XML utilities: tree navigation, element conversion and schema validation.

mod convert;
mod schema;
mod utils;

pub use convert::convert_element;
pub use schema::{PermissiveSchema, SchemaValidator, ServicesSchema};
pub use utils::{
    direct_text, element_children, find_child, find_children, get_attribute, get_tag_name,
    get_text, has_text, is_services_element, position,
};
