//! Wire control messages
//!
//! The fixed control strings of the protocol. All are sent as single
//! newline-terminated lines; none may themselves contain a newline.

pub const AUTH_CHALLENGE: &str = "AUTH REQUIRED. SEND 'USERNAME:PASSWORD'";
pub const AUTH_SUCCESS: &str = "AUTH SUCCESSFUL. SESSION STARTED.";
pub const AUTH_FAILED: &str = "AUTH FAILED. CLOSING CONNECTION.";

pub const INVALID_COMMAND: &str = "INVALID COMMAND";

pub const UPLOAD_READY: &str = "READY TO RECEIVE FILE. SEND 'FILENAME:<filename>'";
pub const RECEIVING_CHUNKS: &str = "RECEIVING CHUNKS";
pub const CHUNK_RECEIVED: &str = "CHUNK RECEIVED";
pub const UPLOAD_FAILED: &str = "UPLOAD FAILED";

pub const DOWNLOAD_PROMPT: &str = "SEND FILENAME TO DOWNLOAD";
pub const FILE_EXISTS: &str = "FILE EXISTS. SENDING FILE...";
pub const DOWNLOAD_FAILED: &str = "DOWNLOAD FAILED";

pub const PREVIEW_PROMPT: &str = "SEND FILENAME TO PREVIEW";

pub const DELETE_PROMPT: &str = "SEND FILENAME TO DELETE";
pub const DELETE_FAILED: &str = "DELETE FAILED";

pub const NO_FILES_FOUND: &str = "NO FILES FOUND";
pub const LIST_FAILED: &str = "LIST DIRECTORY FAILED";

pub const SERVER_SHUTDOWN: &str = "SERVER SHUTDOWN";

/// Prefix the client must put in front of the upload target filename.
pub const FILENAME_PREFIX: &str = "FILENAME:";

pub fn upload_successful(filename: &str) -> String {
    format!("UPLOAD SUCCESSFUL: {}", filename)
}

pub fn delete_successful(filename: &str) -> String {
    format!("FILE '{}' DELETED SUCCESSFULLY.", filename)
}

/// Body of the LIST response frame.
pub fn file_listing(names: &[String]) -> String {
    if names.is_empty() {
        NO_FILES_FOUND.to_string()
    } else {
        format!("FILES:\n{}", names.join("\n"))
    }
}
