//! Execution results: status and per-object change records.

use crate::object::{ObjectDigest, ObjectId, ObjectRef, Owner, SequenceNumber, SuiAddress};
use crate::TransactionDigest;
use serde::{Deserialize, Serialize};

/// One object-level effect of an executed transaction.
///
/// Each kind carries the fields the ledger always reports for it. Records with
/// an unknown `type` tag or a missing field fail to deserialize rather than
/// being skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ObjectChange {
    #[serde(rename_all = "camelCase")]
    Created {
        sender: SuiAddress,
        owner: Owner,
        object_type: String,
        object_id: ObjectId,
        version: SequenceNumber,
        digest: ObjectDigest,
    },
    #[serde(rename_all = "camelCase")]
    Mutated {
        sender: SuiAddress,
        owner: Owner,
        object_type: String,
        object_id: ObjectId,
        version: SequenceNumber,
        previous_version: SequenceNumber,
        digest: ObjectDigest,
    },
    #[serde(rename_all = "camelCase")]
    Transferred {
        sender: SuiAddress,
        recipient: Owner,
        object_type: String,
        object_id: ObjectId,
        version: SequenceNumber,
        digest: ObjectDigest,
    },
    #[serde(rename_all = "camelCase")]
    Published {
        package_id: ObjectId,
        version: SequenceNumber,
        digest: ObjectDigest,
        modules: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    Deleted {
        sender: SuiAddress,
        object_type: String,
        object_id: ObjectId,
        version: SequenceNumber,
    },
    #[serde(rename_all = "camelCase")]
    Wrapped {
        sender: SuiAddress,
        object_type: String,
        object_id: ObjectId,
        version: SequenceNumber,
    },
}

impl ObjectChange {
    /// New reference of `id` if this change is a mutation of it.
    pub fn mutated_ref(&self, id: &ObjectId) -> Option<ObjectRef> {
        match self {
            ObjectChange::Mutated {
                object_id,
                version,
                digest,
                ..
            } if object_id == id => Some(ObjectRef::new(*object_id, *version, digest.clone())),
            _ => None,
        }
    }

    /// Id and type of a newly created object.
    pub fn created(&self) -> Option<(ObjectId, &str)> {
        match self {
            ObjectChange::Created {
                object_id,
                object_type,
                ..
            } => Some((*object_id, object_type.as_str())),
            _ => None,
        }
    }
}

/// Outcome of executing a transaction on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Failure { error: String },
}

impl ExecutionStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionStatus::Success)
    }
}

/// Ledger response to an executed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub digest: TransactionDigest,
    pub status: ExecutionStatus,
    pub object_changes: Vec<ObjectChange>,
}

impl TransactionResponse {
    /// Find the new reference of an object mutated by this transaction.
    pub fn find_mutated(&self, id: &ObjectId) -> Option<ObjectRef> {
        self.object_changes
            .iter()
            .find_map(|change| change.mutated_ref(id))
    }

    /// Ids of created objects whose type contains `type_marker`.
    pub fn created_of_type(&self, type_marker: &str) -> Vec<ObjectId> {
        self.object_changes
            .iter()
            .filter_map(|change| change.created())
            .filter(|(_, object_type)| object_type.contains(type_marker))
            .map(|(id, _)| id)
            .collect()
    }
}
