use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 作成日時・更新日時
/// 永続化境界のデコレーターだけが書き込む
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStamp {
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl AuditStamp {
    /// 保存済みの値から復元
    pub fn reconstruct(created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> Self {
        Self {
            created_at: Some(created_at),
            updated_at: Some(updated_at),
        }
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// 未保存なら作成日時と更新日時を、保存済みなら更新日時だけを設定する
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if self.created_at.is_none() {
            self.created_at = Some(now);
        }
        self.updated_at = Some(now);
    }
}

/// 監査日時を持つ集約
pub trait Auditable {
    fn audit_stamp_mut(&mut self) -> &mut AuditStamp;
}
