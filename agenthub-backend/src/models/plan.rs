use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Billing period of a subscription plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanPeriod {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl PlanPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanPeriod::Daily => "daily",
            PlanPeriod::Weekly => "weekly",
            PlanPeriod::Monthly => "monthly",
            PlanPeriod::Yearly => "yearly",
        }
    }

    pub fn from_str(s: &str) -> Option<PlanPeriod> {
        match s {
            "daily" => Some(PlanPeriod::Daily),
            "weekly" => Some(PlanPeriod::Weekly),
            "monthly" => Some(PlanPeriod::Monthly),
            "yearly" => Some(PlanPeriod::Yearly),
            _ => None,
        }
    }

    pub fn duration_days(&self) -> i64 {
        match self {
            PlanPeriod::Daily => 1,
            PlanPeriod::Weekly => 7,
            PlanPeriod::Monthly => 30,
            PlanPeriod::Yearly => 365,
        }
    }
}

/// A billing tier with metered features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    pub plan_id: i64,
    pub plan_name: String,
    pub plan_description: Option<String>,
    pub plan_period: PlanPeriod,
    pub plan_tier: Option<String>,
    pub plan_price: f64,
    pub plan_currency: String,
    pub is_trial: bool,
    pub is_active: bool,
    pub meta_data: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionPlan {
    pub fn price_display(&self) -> String {
        if self.plan_price > 0.0 {
            format!("{:.2} {}", self.plan_price, self.plan_currency)
        } else {
            "Free".to_string()
        }
    }

    pub fn expiry_date(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        from + chrono::Duration::days(self.plan_period.duration_days())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanFeature {
    pub feature_id: i64,
    pub plan_id: i64,
    pub feature_name: String,
    pub feature_type: Option<String>,
    pub feature_description: Option<String>,
    pub feature_limit: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user's subscription to a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSubscription {
    pub subscription_id: i64,
    pub user_id: i64,
    pub plan_id: i64,
    pub stripe_subscription_id: Option<String>,
    pub usage_start_date: DateTime<Utc>,
    pub is_active: bool,
    pub is_deleted: bool,
    pub meta_data: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserSubscription {
    /// End of the metered window: start date plus the plan's period duration.
    pub fn usage_end_date(&self, plan: &SubscriptionPlan) -> DateTime<Utc> {
        plan.expiry_date(self.usage_start_date)
    }

    pub fn is_valid(&self, plan: &SubscriptionPlan, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_deleted && self.usage_end_date(plan) > now
    }

    pub fn is_expired(&self, plan: &SubscriptionPlan, now: DateTime<Utc>) -> bool {
        now > self.usage_end_date(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(period: PlanPeriod, price: f64) -> SubscriptionPlan {
        let now = Utc::now();
        SubscriptionPlan {
            plan_id: 1,
            plan_name: "Pro".to_string(),
            plan_description: None,
            plan_period: period,
            plan_tier: Some("pro".to_string()),
            plan_price: price,
            plan_currency: "USD".to_string(),
            is_trial: false,
            is_active: true,
            meta_data: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn period_durations() {
        assert_eq!(PlanPeriod::Daily.duration_days(), 1);
        assert_eq!(PlanPeriod::Weekly.duration_days(), 7);
        assert_eq!(PlanPeriod::Monthly.duration_days(), 30);
        assert_eq!(PlanPeriod::Yearly.duration_days(), 365);
        assert_eq!(PlanPeriod::from_str("quarterly"), None);
    }

    #[test]
    fn price_display_handles_free_plans() {
        assert_eq!(plan(PlanPeriod::Monthly, 0.0).price_display(), "Free");
        assert_eq!(plan(PlanPeriod::Monthly, 19.5).price_display(), "19.50 USD");
    }

    #[test]
    fn subscription_validity_window() {
        let now = Utc::now();
        let monthly = plan(PlanPeriod::Monthly, 10.0);
        let mut sub = UserSubscription {
            subscription_id: 1,
            user_id: 1,
            plan_id: 1,
            stripe_subscription_id: None,
            usage_start_date: now - chrono::Duration::days(5),
            is_active: true,
            is_deleted: false,
            meta_data: None,
            created_at: now,
            updated_at: now,
        };
        assert!(sub.is_valid(&monthly, now));
        assert!(!sub.is_expired(&monthly, now));

        sub.usage_start_date = now - chrono::Duration::days(45);
        assert!(!sub.is_valid(&monthly, now));
        assert!(sub.is_expired(&monthly, now));

        sub.usage_start_date = now;
        sub.is_deleted = true;
        assert!(!sub.is_valid(&monthly, now));
    }
}
