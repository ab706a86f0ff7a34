//! Object and ACL document types
//!
//! Defines the wire-level shapes exchanged with the control plane:
//! - [`ObjectKind`] and [`ObjectRef`] to address permission-bearing objects
//! - [`AclDocument`] and [`AclEntry`] for the parsed ACL
//! - [`PermissionRecord`], the crawl-time snapshot of one object's ACL

use crate::error::AclError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kinds of objects carrying SQL permissions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Alerts,
    Dashboards,
    Queries,
    DataSources,
}

impl ObjectKind {
    /// Every supported kind, in listing order
    pub const ALL: [ObjectKind; 4] = [
        ObjectKind::Alerts,
        ObjectKind::Dashboards,
        ObjectKind::Queries,
        ObjectKind::DataSources,
    ];

    /// Plural form used in control plane paths
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Alerts => "alerts",
            ObjectKind::Dashboards => "dashboards",
            ObjectKind::Queries => "queries",
            ObjectKind::DataSources => "data_sources",
        }
    }

    /// Singular form reported as `object_type` inside ACL documents
    #[inline]
    #[must_use]
    pub fn singular(&self) -> &'static str {
        match self {
            ObjectKind::Alerts => "alert",
            ObjectKind::Dashboards => "dashboard",
            ObjectKind::Queries => "query",
            ObjectKind::DataSources => "data_source",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectKind {
    type Err = AclError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| AclError::UnknownObjectKind(s.to_string()))
    }
}

/// Reference to one remote object whose permissions are inspected
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub object_id: String,
    pub object_kind: ObjectKind,
}

impl ObjectRef {
    #[inline]
    #[must_use]
    pub fn new(object_kind: ObjectKind, object_id: impl Into<String>) -> Self {
        Self {
            object_id: object_id.into(),
            object_kind,
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.object_kind, self.object_id)
    }
}

/// Permission level granted by one ACL entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionLevel {
    CanView,
    CanRun,
    CanEdit,
    CanManage,
}

/// One grant inside an ACL document
///
/// The principal is a display name, not a stable id. Exactly one of
/// `group_name` and `user_name` is expected to be set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AclEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission_level: Option<PermissionLevel>,
}

impl AclEntry {
    /// Grant for a group principal
    #[inline]
    #[must_use]
    pub fn group(name: impl Into<String>, level: PermissionLevel) -> Self {
        Self {
            group_name: Some(name.into()),
            user_name: None,
            permission_level: Some(level),
        }
    }

    /// Grant for a user principal
    #[inline]
    #[must_use]
    pub fn user(name: impl Into<String>, level: PermissionLevel) -> Self {
        Self {
            group_name: None,
            user_name: Some(name.into()),
            permission_level: Some(level),
        }
    }

    /// Display name of the principal, group first
    #[inline]
    #[must_use]
    pub fn principal_name(&self) -> Option<&str> {
        self.group_name.as_deref().or(self.user_name.as_deref())
    }

    /// Copy of this entry granted to a different group
    #[inline]
    #[must_use]
    pub fn with_group_name(&self, name: impl Into<String>) -> Self {
        Self {
            group_name: Some(name.into()),
            ..self.clone()
        }
    }
}

/// Parsed ACL document as returned by the control plane
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    #[serde(default)]
    pub access_control_list: Vec<AclEntry>,
}

impl AclDocument {
    #[inline]
    #[must_use]
    pub fn new(object: &ObjectRef, access_control_list: Vec<AclEntry>) -> Self {
        Self {
            object_id: Some(object.object_id.clone()),
            object_type: Some(object.object_kind.singular().to_string()),
            access_control_list,
        }
    }

    /// Group names mentioned by this document
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.access_control_list
            .iter()
            .filter_map(|entry| entry.group_name.as_deref())
    }
}

/// Snapshot of one object's ACL at crawl time
///
/// `raw_acl` holds the serialized [`AclDocument`] exactly as fetched. Records
/// are never mutated; a new crawl produces new records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRecord {
    pub object_id: String,
    pub object_kind: ObjectKind,
    pub raw_acl: String,
}

impl PermissionRecord {
    /// Build a record by serializing a fetched document
    ///
    /// # Errors
    /// Returns [`AclError::Serialization`] if the document cannot be encoded.
    pub fn from_document(object: &ObjectRef, document: &AclDocument) -> Result<Self, AclError> {
        let raw_acl = serde_json::to_string(document).map_err(AclError::Serialization)?;
        Ok(Self {
            object_id: object.object_id.clone(),
            object_kind: object.object_kind,
            raw_acl,
        })
    }

    #[inline]
    #[must_use]
    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef::new(self.object_kind, self.object_id.clone())
    }

    /// Parse the stored ACL document
    ///
    /// # Errors
    /// Returns [`AclError::MalformedDocument`] when `raw_acl` does not parse.
    pub fn document(&self) -> Result<AclDocument, AclError> {
        serde_json::from_str(&self.raw_acl).map_err(|source| AclError::MalformedDocument {
            object_kind: self.object_kind.to_string(),
            object_id: self.object_id.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn object_kind_round_trips_through_str() {
        for kind in ObjectKind::ALL {
            assert_eq!(kind.as_str().parse::<ObjectKind>().unwrap(), kind);
        }
        assert!(matches!(
            "notebooks".parse::<ObjectKind>(),
            Err(AclError::UnknownObjectKind(_))
        ));
    }

    #[test]
    fn object_kind_serializes_plural() {
        let json = serde_json::to_string(&ObjectKind::DataSources).unwrap();
        assert_eq!(json, "\"data_sources\"");
    }

    #[test]
    fn entry_parses_control_plane_shape() {
        let raw = r#"{"object_id":"q1","object_type":"query","access_control_list":[
            {"group_name":"eng-ws","permission_level":"CAN_RUN"},
            {"user_name":"alice","permission_level":"CAN_VIEW","extra":true}
        ]}"#;
        let doc: AclDocument = serde_json::from_str(raw).unwrap();

        assert_eq!(doc.access_control_list.len(), 2);
        assert_eq!(
            doc.access_control_list[0],
            AclEntry::group("eng-ws", PermissionLevel::CanRun)
        );
        assert_eq!(doc.access_control_list[1].principal_name(), Some("alice"));
        assert_eq!(doc.group_names().collect::<Vec<_>>(), vec!["eng-ws"]);
    }

    #[test]
    fn record_document_reports_malformed_raw() {
        let record = PermissionRecord {
            object_id: "d1".into(),
            object_kind: ObjectKind::Dashboards,
            raw_acl: "{not json".into(),
        };
        let err = record.document().unwrap_err();
        assert!(matches!(err, AclError::MalformedDocument { .. }));
        assert!(err.to_string().contains("dashboards d1"));
    }

    #[test]
    fn record_keeps_fetched_document() {
        let object = ObjectRef::new(ObjectKind::Queries, "q1");
        let doc = AclDocument::new(
            &object,
            vec![AclEntry::user("bob", PermissionLevel::CanManage)],
        );
        let record = PermissionRecord::from_document(&object, &doc).unwrap();

        assert_eq!(record.object_ref(), object);
        assert_eq!(record.document().unwrap(), doc);
    }
}
