//! Subscription plan, feature and user-subscription operations

use chrono::Utc;
use rusqlite::Result as SqliteResult;

use super::super::Database;
use super::json;
use crate::models::{PlanFeature, PlanPeriod, SubscriptionPlan, UserSubscription};

impl Database {
    pub fn create_plan(
        &self,
        plan_name: &str,
        plan_description: Option<&str>,
        plan_period: PlanPeriod,
        plan_tier: Option<&str>,
        plan_price: f64,
        plan_currency: &str,
        is_trial: bool,
    ) -> SqliteResult<SubscriptionPlan> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let now_str = now.to_rfc3339();
        conn.execute(
            "INSERT INTO subscription_plans
             (plan_name, plan_description, plan_period, plan_tier, plan_price, plan_currency,
              is_trial, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            rusqlite::params![
                plan_name,
                plan_description,
                plan_period.as_str(),
                plan_tier,
                plan_price,
                plan_currency,
                is_trial as i32,
                &now_str,
            ],
        )?;
        Ok(SubscriptionPlan {
            plan_id: conn.last_insert_rowid(),
            plan_name: plan_name.to_string(),
            plan_description: plan_description.map(|s| s.to_string()),
            plan_period,
            plan_tier: plan_tier.map(|s| s.to_string()),
            plan_price,
            plan_currency: plan_currency.to_string(),
            is_trial,
            is_active: true,
            meta_data: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get_plan(&self, plan_id: i64) -> SqliteResult<Option<SubscriptionPlan>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT plan_id, plan_name, plan_description, plan_period, plan_tier, plan_price,
             plan_currency, is_trial, is_active, meta_data, created_at, updated_at
             FROM subscription_plans WHERE plan_id = ?1",
        )?;
        let plan = stmt.query_row([plan_id], |row| Self::row_to_plan(row)).ok();
        Ok(plan)
    }

    pub fn list_active_plans(&self) -> SqliteResult<Vec<SubscriptionPlan>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT plan_id, plan_name, plan_description, plan_period, plan_tier, plan_price,
             plan_currency, is_trial, is_active, meta_data, created_at, updated_at
             FROM subscription_plans WHERE is_active = 1 ORDER BY plan_price",
        )?;
        let plans = stmt
            .query_map([], |row| Self::row_to_plan(row))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(plans)
    }

    /// Returns None when the feature name already exists on this plan.
    pub fn add_plan_feature(
        &self,
        plan_id: i64,
        feature_name: &str,
        feature_type: Option<&str>,
        feature_description: Option<&str>,
        feature_limit: Option<i64>,
    ) -> SqliteResult<Option<PlanFeature>> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let now_str = now.to_rfc3339();
        let changed = conn.execute(
            "INSERT OR IGNORE INTO plan_features
             (plan_id, feature_name, feature_type, feature_description, feature_limit,
              created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            rusqlite::params![
                plan_id,
                feature_name,
                feature_type,
                feature_description,
                feature_limit,
                &now_str,
            ],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        Ok(Some(PlanFeature {
            feature_id: conn.last_insert_rowid(),
            plan_id,
            feature_name: feature_name.to_string(),
            feature_type: feature_type.map(|s| s.to_string()),
            feature_description: feature_description.map(|s| s.to_string()),
            feature_limit,
            is_active: true,
            created_at: now,
            updated_at: now,
        }))
    }

    pub fn list_plan_features(&self, plan_id: i64) -> SqliteResult<Vec<PlanFeature>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT feature_id, plan_id, feature_name, feature_type, feature_description,
             feature_limit, is_active, created_at, updated_at
             FROM plan_features WHERE plan_id = ?1 AND is_active = 1 ORDER BY feature_name",
        )?;
        let features = stmt
            .query_map([plan_id], |row| {
                Ok(PlanFeature {
                    feature_id: row.get(0)?,
                    plan_id: row.get(1)?,
                    feature_name: row.get(2)?,
                    feature_type: row.get(3)?,
                    feature_description: row.get(4)?,
                    feature_limit: row.get(5)?,
                    is_active: row.get::<_, i32>(6)? != 0,
                    created_at: Self::parse_time(row.get::<_, String>(7)?),
                    updated_at: Self::parse_time(row.get::<_, String>(8)?),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(features)
    }

    pub fn create_subscription(
        &self,
        user_id: i64,
        plan_id: i64,
        stripe_subscription_id: Option<&str>,
        meta_data: Option<&serde_json::Value>,
    ) -> SqliteResult<UserSubscription> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let now_str = now.to_rfc3339();
        conn.execute(
            "INSERT INTO user_subscriptions
             (user_id, plan_id, stripe_subscription_id, usage_start_date, meta_data,
              created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?4, ?4)",
            rusqlite::params![
                user_id,
                plan_id,
                stripe_subscription_id,
                &now_str,
                meta_data.map(|m| m.to_string()),
            ],
        )?;
        Ok(UserSubscription {
            subscription_id: conn.last_insert_rowid(),
            user_id,
            plan_id,
            stripe_subscription_id: stripe_subscription_id.map(|s| s.to_string()),
            usage_start_date: now,
            is_active: true,
            is_deleted: false,
            meta_data: meta_data.cloned(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get_subscription_for_user(
        &self,
        subscription_id: i64,
        user_id: i64,
    ) -> SqliteResult<Option<UserSubscription>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT subscription_id, user_id, plan_id, stripe_subscription_id, usage_start_date,
             is_active, is_deleted, meta_data, created_at, updated_at
             FROM user_subscriptions
             WHERE subscription_id = ?1 AND user_id = ?2 AND is_deleted = 0",
        )?;
        let subscription = stmt
            .query_row([subscription_id, user_id], |row| Self::row_to_subscription(row))
            .ok();
        Ok(subscription)
    }

    pub fn list_subscriptions_for_user(&self, user_id: i64) -> SqliteResult<Vec<UserSubscription>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT subscription_id, user_id, plan_id, stripe_subscription_id, usage_start_date,
             is_active, is_deleted, meta_data, created_at, updated_at
             FROM user_subscriptions
             WHERE user_id = ?1 AND is_deleted = 0 ORDER BY created_at DESC",
        )?;
        let subscriptions = stmt
            .query_map([user_id], |row| Self::row_to_subscription(row))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(subscriptions)
    }

    pub fn update_subscription(
        &self,
        subscription_id: i64,
        user_id: i64,
        is_active: Option<bool>,
        meta_data: Option<&serde_json::Value>,
    ) -> SqliteResult<Option<UserSubscription>> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let changed = conn.execute(
            "UPDATE user_subscriptions SET
                is_active = COALESCE(?1, is_active),
                meta_data = COALESCE(?2, meta_data),
                updated_at = ?3
             WHERE subscription_id = ?4 AND user_id = ?5 AND is_deleted = 0",
            rusqlite::params![
                is_active.map(|b| b as i32),
                meta_data.map(|m| m.to_string()),
                &now,
                subscription_id,
                user_id,
            ],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        drop(conn);
        self.get_subscription_for_user(subscription_id, user_id)
    }

    pub fn soft_delete_subscription(&self, subscription_id: i64, user_id: i64) -> SqliteResult<bool> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let changed = conn.execute(
            "UPDATE user_subscriptions SET is_deleted = 1, is_active = 0, updated_at = ?1
             WHERE subscription_id = ?2 AND user_id = ?3 AND is_deleted = 0",
            rusqlite::params![&now, subscription_id, user_id],
        )?;
        Ok(changed > 0)
    }

    fn row_to_plan(row: &rusqlite::Row) -> rusqlite::Result<SubscriptionPlan> {
        let period_str: String = row.get(3)?;
        let meta_str: Option<String> = row.get(9)?;
        Ok(SubscriptionPlan {
            plan_id: row.get(0)?,
            plan_name: row.get(1)?,
            plan_description: row.get(2)?,
            plan_period: PlanPeriod::from_str(&period_str).unwrap_or(PlanPeriod::Monthly),
            plan_tier: row.get(4)?,
            plan_price: row.get(5)?,
            plan_currency: row.get(6)?,
            is_trial: row.get::<_, i32>(7)? != 0,
            is_active: row.get::<_, i32>(8)? != 0,
            meta_data: json::parse_opt(meta_str),
            created_at: Self::parse_time(row.get::<_, String>(10)?),
            updated_at: Self::parse_time(row.get::<_, String>(11)?),
        })
    }

    fn row_to_subscription(row: &rusqlite::Row) -> rusqlite::Result<UserSubscription> {
        let meta_str: Option<String> = row.get(7)?;
        Ok(UserSubscription {
            subscription_id: row.get(0)?,
            user_id: row.get(1)?,
            plan_id: row.get(2)?,
            stripe_subscription_id: row.get(3)?,
            usage_start_date: Self::parse_time(row.get::<_, String>(4)?),
            is_active: row.get::<_, i32>(5)? != 0,
            is_deleted: row.get::<_, i32>(6)? != 0,
            meta_data: json::parse_opt(meta_str),
            created_at: Self::parse_time(row.get::<_, String>(8)?),
            updated_at: Self::parse_time(row.get::<_, String>(9)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> (Database, tempfile::TempDir, i64) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("test.db").to_str().unwrap()).unwrap();
        let user = db.create_user("owner@example.com", "hash", "Owner").unwrap();
        (db, dir, user.id)
    }

    #[test]
    fn test_plan_and_features() {
        let (db, _dir, _user_id) = seeded();
        let plan = db
            .create_plan("Pro", Some("For teams"), PlanPeriod::Monthly, Some("pro"), 19.0, "USD", false)
            .unwrap();
        assert!(db
            .add_plan_feature(plan.plan_id, "agents", Some("count"), None, Some(10))
            .unwrap()
            .is_some());
        // Duplicate feature name on the same plan is rejected.
        assert!(db
            .add_plan_feature(plan.plan_id, "agents", None, None, Some(20))
            .unwrap()
            .is_none());

        let plans = db.list_active_plans().unwrap();
        assert_eq!(plans.len(), 1);
        let features = db.list_plan_features(plan.plan_id).unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].feature_limit, Some(10));
    }

    #[test]
    fn test_subscription_lifecycle() {
        let (db, _dir, user_id) = seeded();
        let plan = db
            .create_plan("Pro", None, PlanPeriod::Monthly, None, 19.0, "USD", false)
            .unwrap();
        let subscription = db
            .create_subscription(user_id, plan.plan_id, Some("sub_123"), None)
            .unwrap();
        assert!(subscription.is_valid(&plan, Utc::now()));

        let updated = db
            .update_subscription(subscription.subscription_id, user_id, Some(false), None)
            .unwrap()
            .unwrap();
        assert!(!updated.is_active);

        assert!(db.soft_delete_subscription(subscription.subscription_id, user_id).unwrap());
        assert!(db.list_subscriptions_for_user(user_id).unwrap().is_empty());
        assert!(db
            .get_subscription_for_user(subscription.subscription_id, user_id)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_subscription_scoped_to_owner() {
        let (db, _dir, user_id) = seeded();
        let other = db.create_user("other@example.com", "hash", "Other").unwrap();
        let plan = db
            .create_plan("Pro", None, PlanPeriod::Monthly, None, 19.0, "USD", false)
            .unwrap();
        let subscription = db.create_subscription(user_id, plan.plan_id, None, None).unwrap();

        assert!(db
            .get_subscription_for_user(subscription.subscription_id, other.id)
            .unwrap()
            .is_none());
        assert!(!db.soft_delete_subscription(subscription.subscription_id, other.id).unwrap());
    }
}
