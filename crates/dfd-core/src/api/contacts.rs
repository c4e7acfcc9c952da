//! Contact requests between users.

use serde_json::json;

use crate::models::{Contact, ContactState, ContactUser};

use super::client::SessionManager;
use super::request::ApiRequest;
use super::Result;

const CONTACTS_PATH: &str = "/contacts/";
const ACCEPTED_PATH: &str = "/contacts/accepted/";
const PENDING_SENT_PATH: &str = "/contacts/pending-sent/";
const PENDING_RECEIVED_PATH: &str = "/contacts/pending-received/";
const SEARCH_PATH: &str = "/contacts/search/";
const ACCEPT_PATH: &str = "/contacts/accept/";
const DELETE_PATH: &str = "/contacts/delete/";

impl SessionManager {
    /// Users who are already contacts, in either direction.
    pub async fn accepted_contacts(&self) -> Result<Vec<ContactUser>> {
        self.get(ACCEPTED_PATH).await
    }

    /// Users the current user has sent a pending request to.
    pub async fn pending_sent(&self) -> Result<Vec<ContactUser>> {
        self.get(PENDING_SENT_PATH).await
    }

    /// Users waiting on the current user to accept their request.
    pub async fn pending_received(&self) -> Result<Vec<ContactUser>> {
        self.get(PENDING_RECEIVED_PATH).await
    }

    /// Users with no accepted or pending request either way.
    pub async fn discoverable_users(&self) -> Result<Vec<ContactUser>> {
        self.get(SEARCH_PATH).await
    }

    pub async fn send_contact_request(&self, receiver: i64) -> Result<Contact> {
        self.post(
            CONTACTS_PATH,
            &json!({ "receiver": receiver, "state": ContactState::Pending }),
        )
        .await
    }

    /// Accept a pending request sent by `sender`.
    pub async fn accept_contact(&self, sender: i64) -> Result<()> {
        self.execute_empty(ApiRequest::patch(ACCEPT_PATH).json(&json!({ "user_two": sender }))?)
            .await
    }

    /// Remove the contact or pending request between the current user and `other`.
    pub async fn remove_contact(&self, other: i64) -> Result<()> {
        self.execute_empty(ApiRequest::delete(DELETE_PATH).json(&json!({ "user_two": other }))?)
            .await
    }
}
