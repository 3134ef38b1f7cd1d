//! Shared request/response types.

mod pagination;
mod response;

pub use pagination::{
    PageInfo, Paginated, PaginatedFiles, PaginatedItems, PaginatedUsers, PaginationParams,
};
pub use response::{Created, MessageResponse, NoContent};
