#![allow(clippy::unwrap_used, clippy::expect_used)]

use crudkit_security::SecurityContext;
use uuid::Uuid;

use crate::capability::{Capabilities, Capability};
use crate::entity::Entity;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plain {
    pub id: i64,
    pub label: String,
}

impl Entity for Plain {
    type Key = i64;
    const NAME: &'static str = "plain";
    const CAPABILITIES: Capabilities = Capabilities::NONE;

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

impl Entity for Tag {
    type Key = i64;
    const NAME: &'static str = "tag";
    const CAPABILITIES: Capabilities = Capabilities::of(&[Capability::SoftDeletable]);

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memo {
    pub id: i64,
    pub text: String,
}

impl Entity for Memo {
    type Key = i64;
    const NAME: &'static str = "memo";
    const CAPABILITIES: Capabilities =
        Capabilities::of(&[Capability::SoftDeletable, Capability::TenantScoped]);

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

pub fn tag(id: i64, name: &str) -> Tag {
    Tag {
        id,
        name: name.to_owned(),
    }
}

pub fn memo(id: i64, text: &str) -> Memo {
    Memo {
        id,
        text: text.to_owned(),
    }
}

pub fn ctx_for_tenant(tenant: i64) -> SecurityContext {
    SecurityContext::builder()
        .subject_id(Uuid::new_v4())
        .tenant_id(tenant)
        .build()
}
