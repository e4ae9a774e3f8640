use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub type GroupId = String;
pub type ExpenseId = i64;

/// Every group of the deployment, keyed by group id. Persisted as one document.
pub type Collection = BTreeMap<GroupId, Group>;

// Client-supplied fields are kept as raw JSON: whatever the caller sent is
// stored and echoed back, and an absent field becomes `null`.

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: GroupId,
    #[serde(default)]
    pub name: Value,
    pub members: Vec<Value>,
    pub expenses: Vec<Expense>,
    pub created_at: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Expense {
    pub id: ExpenseId,
    #[serde(default)]
    pub payer: Value,
    #[serde(default)]
    pub description: Value,
    #[serde(default)]
    pub amount: Value,
}

impl Group {
    pub fn new(id: GroupId, name: Value, created_at: String) -> Self {
        Group {
            id,
            name,
            members: vec![],
            expenses: vec![],
            created_at,
        }
    }

    /// Appends `name` unless an equal value is already a member.
    pub fn add_member(&mut self, name: Value) {
        if !self.members.contains(&name) {
            self.members.push(name);
        }
    }

    /// Drops the member along with every expense they paid. Unknown names are ignored.
    pub fn remove_member(&mut self, name: &str) {
        self.members.retain(|member| member.as_str() != Some(name));
        self.expenses
            .retain(|expense| expense.payer.as_str() != Some(name));
    }

    pub fn add_expense(&mut self, expense: Expense) {
        self.expenses.push(expense);
    }

    pub fn remove_expense(&mut self, id: ExpenseId) {
        self.expenses.retain(|expense| expense.id != id);
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct NewGroup {
    #[serde(default)]
    pub name: Value,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct NewMember {
    #[serde(default)]
    pub name: Value,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct NewExpense {
    #[serde(default)]
    pub payer: Value,
    #[serde(default)]
    pub description: Value,
    #[serde(default)]
    pub amount: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDeleted {
    pub success: bool,
    pub group_id: GroupId,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub success: bool,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorBody {
    pub error: String,
}
