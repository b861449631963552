//! Reqwest-based directory gateway: paged group-member enumeration and the
//! places catalogue.

use std::sync::Arc;

use async_trait::async_trait;
use graphscope_application::{CredentialProvider, DirectoryGateway, MemberPage, PlaceRecord};
use graphscope_core::{AppError, AppResult, GroupId};
use graphscope_domain::DirectoryMember;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct MemberPagePayload {
    #[serde(default)]
    value: Vec<MemberPayload>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemberPayload {
    #[serde(default)]
    id: String,
    mail: Option<String>,
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlacePagePayload {
    #[serde(default)]
    value: Vec<PlacePayload>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlacePayload {
    #[serde(default)]
    id: String,
    email_address: Option<String>,
    display_name: Option<String>,
    capacity: Option<u32>,
    building: Option<String>,
    floor_label: Option<String>,
}

/// Directory gateway talking to the upstream Graph API with app
/// credentials.
pub struct GraphDirectoryGateway {
    http_client: reqwest::Client,
    credentials: Arc<dyn CredentialProvider>,
    base_url: String,
}

impl GraphDirectoryGateway {
    /// Creates a gateway against `base_url` (no trailing slash).
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        credentials: Arc<dyn CredentialProvider>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            credentials,
            base_url: base_url.into(),
        }
    }

    async fn fetch_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> AppResult<T> {
        let bearer = self.credentials.bearer_token().await?;

        let response = self
            .http_client
            .get(url)
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(|error| {
                AppError::UpstreamUnavailable(format!("directory request failed: {error}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::UpstreamUnavailable(format!(
                "directory request returned status {status}"
            )));
        }

        response.json::<T>().await.map_err(|error| {
            AppError::UpstreamUnavailable(format!("invalid directory payload: {error}"))
        })
    }
}

#[async_trait]
impl DirectoryGateway for GraphDirectoryGateway {
    async fn fetch_member_page(
        &self,
        group_id: &GroupId,
        cursor: Option<&str>,
        page_size: usize,
    ) -> AppResult<MemberPage> {
        // The continuation cursor is the absolute next-link URL upstream
        // handed back; the first page is built from the group id.
        let url = match cursor {
            Some(next_link) => next_link.to_owned(),
            None => format!(
                "{}/v1.0/groups/{}/members?$top={page_size}&$select=id,mail,displayName",
                self.base_url,
                group_id.as_str()
            ),
        };

        let payload: MemberPagePayload = self.fetch_json(&url).await?;

        Ok(MemberPage {
            members: payload
                .value
                .into_iter()
                .map(|member| DirectoryMember {
                    id: member.id,
                    mail: member.mail,
                    display_name: member.display_name,
                })
                .collect(),
            next_cursor: payload.next_link,
        })
    }

    async fn fetch_places(&self) -> AppResult<Vec<PlaceRecord>> {
        let mut url = format!("{}/v1.0/places/microsoft.graph.room", self.base_url);
        let mut places = Vec::new();

        loop {
            let payload: PlacePagePayload = self.fetch_json(&url).await?;

            places.extend(payload.value.into_iter().map(|place| PlaceRecord {
                id: place.id,
                mail: place.email_address,
                display_name: place.display_name,
                capacity: place.capacity,
                location: place.building.or(place.floor_label),
            }));

            match payload.next_link {
                Some(next_link) => url = next_link,
                None => break,
            }
        }

        Ok(places)
    }
}
