use serde::Serialize;

/// An `EnumType` member with its underlying value resolved. Implicit values
/// number members 0..n in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumMember {
    pub name: String,
    pub value: i64,
}

/// An `EnumType` declaration. Members either all carry explicit `Value`
/// attributes or none do; mixed declarations are rejected during resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumTypeDescriptor {
    pub short_name: String,
    pub namespace: Option<String>,
    pub alias: Option<String>,
    pub full_name: String,

    /// `UnderlyingType` defaults to `Edm.Int32` when absent.
    pub underlying_type: String,

    /// `IsFlags` defaults to false when absent.
    pub is_flags: bool,

    pub members: Vec<EnumMember>,
}

impl EnumTypeDescriptor {
    pub fn member(&self, name: &str) -> Option<&EnumMember> {
        self.members.iter().find(|m| m.name == name)
    }
}
