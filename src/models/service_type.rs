// Service type tags
//
// Every query sent by the dashboard frontend declares which Azure service
// family it targets. The tag strings are fixed by the frontend and matched
// exactly.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::api::middleware::AppError;

/// Azure service family a query is routed to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ServiceType {
    /// Azure Monitor metrics
    #[serde(rename = "Azure Monitor")]
    AzureMonitor,
    /// Application Insights metrics
    #[serde(rename = "Application Insights")]
    ApplicationInsights,
    /// Azure Log Analytics (KQL over workspaces)
    #[serde(rename = "Azure Log Analytics")]
    AzureLogAnalytics,
    /// Application Insights Analytics (KQL over an app)
    #[serde(rename = "Insights Analytics")]
    InsightsAnalytics,
}

impl ServiceType {
    /// All service types in dispatch order
    pub const ALL: [ServiceType; 4] = [
        ServiceType::AzureMonitor,
        ServiceType::ApplicationInsights,
        ServiceType::AzureLogAnalytics,
        ServiceType::InsightsAnalytics,
    ];

    /// The tag string used by the frontend
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::AzureMonitor => "Azure Monitor",
            ServiceType::ApplicationInsights => "Application Insights",
            ServiceType::AzureLogAnalytics => "Azure Log Analytics",
            ServiceType::InsightsAnalytics => "Insights Analytics",
        }
    }

    /// Position in dispatch order
    pub fn index(&self) -> usize {
        match self {
            ServiceType::AzureMonitor => 0,
            ServiceType::ApplicationInsights => 1,
            ServiceType::AzureLogAnalytics => 2,
            ServiceType::InsightsAnalytics => 3,
        }
    }

    /// URL path segment of the executor endpoint serving this family
    pub fn path(&self) -> &'static str {
        match self {
            ServiceType::AzureMonitor => "azuremonitor",
            ServiceType::ApplicationInsights => "appinsights",
            ServiceType::AzureLogAnalytics => "loganalytics",
            ServiceType::InsightsAnalytics => "insightsanalytics",
        }
    }

    pub fn supported_list() -> String {
        Self::ALL
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl FromStr for ServiceType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Azure Monitor" => Ok(ServiceType::AzureMonitor),
            "Application Insights" => Ok(ServiceType::ApplicationInsights),
            "Azure Log Analytics" => Ok(ServiceType::AzureLogAnalytics),
            "Insights Analytics" => Ok(ServiceType::InsightsAnalytics),
            other => Err(AppError::UnsupportedQueryType(other.to_string())),
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_type_str_conversion() {
        for service in ServiceType::ALL {
            assert_eq!(service.as_str().parse::<ServiceType>().unwrap(), service);
        }
    }

    #[test]
    fn test_dispatch_order_matches_index() {
        for (idx, service) in ServiceType::ALL.iter().enumerate() {
            assert_eq!(service.index(), idx);
        }
    }

    #[test]
    fn test_service_type_parsing_is_exact() {
        assert!(matches!(
            "azure monitor".parse::<ServiceType>(),
            Err(AppError::UnsupportedQueryType(t)) if t == "azure monitor"
        ));
        assert!(matches!(
            "".parse::<ServiceType>(),
            Err(AppError::UnsupportedQueryType(t)) if t.is_empty()
        ));
    }

    #[test]
    fn test_serde_uses_frontend_tags() {
        let json = serde_json::to_string(&ServiceType::AzureLogAnalytics).unwrap();
        assert_eq!(json, "\"Azure Log Analytics\"");

        let parsed: ServiceType = serde_json::from_str("\"Insights Analytics\"").unwrap();
        assert_eq!(parsed, ServiceType::InsightsAnalytics);
    }
}
