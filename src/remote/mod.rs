// file: src/remote/mod.rs
// description: hosted repository client module exports
// reference: internal module structure

pub mod client;
pub mod encoding;
pub mod github;
pub mod memory;

pub use client::{
    PutFileRequest, RemoteContent, RemoteFileSnapshot, RemoteRepoClient, RemoteRepository,
    RepositoryHandle,
};
pub use github::GithubClient;
pub use memory::{MemoryRemote, RecordedWrite};
