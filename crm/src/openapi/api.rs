use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::{api, errors};

/// Registers the bearer token scheme referenced by `security(("BearerAuth" = []))`.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "BearerAuth".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Session token from `POST /api/auth/login` or `POST /api/auth/register`:\n\n\
                            ```\nAuthorization: Bearer YOUR_TOKEN\n```",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    servers(
        (url = "/api", description = "CRM API")
    ),
    modifiers(&SecurityAddon),
    paths(
        // Authentication
        api::handlers::auth::login,
        api::handlers::auth::register,
        api::handlers::auth::me,
        // Users
        api::handlers::users::list_users,
        api::handlers::users::get_user,
        api::handlers::users::create_user,
        api::handlers::users::update_user,
        api::handlers::users::delete_user,
        // Companies
        api::handlers::companies::list_companies,
        api::handlers::companies::get_company,
        api::handlers::companies::create_company,
        api::handlers::companies::update_company,
        api::handlers::companies::delete_company,
        // Contacts
        api::handlers::contacts::list_contacts,
        api::handlers::contacts::get_contact,
        api::handlers::contacts::create_contact,
        api::handlers::contacts::update_contact,
        api::handlers::contacts::delete_contact,
        // Deals
        api::handlers::deals::list_deals,
        api::handlers::deals::get_deal,
        api::handlers::deals::create_deal,
        api::handlers::deals::update_deal,
        api::handlers::deals::delete_deal,
        // Tasks
        api::handlers::tasks::list_tasks,
        api::handlers::tasks::get_task,
        api::handlers::tasks::create_task,
        api::handlers::tasks::update_task,
        api::handlers::tasks::delete_task,
        // Activities
        api::handlers::activities::list_activities,
        api::handlers::activities::get_activity,
        api::handlers::activities::create_activity,
        api::handlers::activities::update_activity,
        api::handlers::activities::delete_activity,
        // Campaigns
        api::handlers::campaigns::list_campaigns,
        api::handlers::campaigns::get_campaign,
        api::handlers::campaigns::create_campaign,
        api::handlers::campaigns::update_campaign,
        api::handlers::campaigns::delete_campaign,
        // Automations
        api::handlers::automations::list_automations,
        api::handlers::automations::get_automation,
        api::handlers::automations::create_automation,
        api::handlers::automations::update_automation,
        api::handlers::automations::delete_automation,
        // Tickets
        api::handlers::tickets::list_tickets,
        api::handlers::tickets::get_ticket,
        api::handlers::tickets::create_ticket,
        api::handlers::tickets::update_ticket,
        api::handlers::tickets::delete_ticket,
        // Subscriptions
        api::handlers::subscriptions::list_subscriptions,
        api::handlers::subscriptions::get_subscription,
        api::handlers::subscriptions::create_subscription,
        api::handlers::subscriptions::update_subscription,
        api::handlers::subscriptions::delete_subscription,
        // Payments
        api::handlers::payments::list_payments,
        api::handlers::payments::get_payment,
        api::handlers::payments::create_payment,
        api::handlers::payments::update_payment,
        api::handlers::payments::delete_payment,
        // Dashboard
        api::handlers::dashboard::get_stats,
        api::handlers::dashboard::get_recent_activities,
    ),
    components(
        schemas(
            api::models::auth::LoginRequest,
            api::models::auth::RegisterRequest,
            api::models::auth::AuthResponse,
            api::models::users::Role,
            api::models::users::UserCreate,
            api::models::users::UserUpdate,
            api::models::users::UserResponse,
            api::models::users::UserListResponse,
            api::models::companies::CompanyCreate,
            api::models::companies::CompanyUpdate,
            api::models::companies::CompanyResponse,
            api::models::companies::CompanyListResponse,
            api::models::contacts::LifecycleStage,
            api::models::contacts::ContactCreate,
            api::models::contacts::ContactUpdate,
            api::models::contacts::ContactResponse,
            api::models::contacts::ContactListResponse,
            api::models::deals::DealStage,
            api::models::deals::DealCreate,
            api::models::deals::DealUpdate,
            api::models::deals::DealResponse,
            api::models::deals::DealListResponse,
            api::models::tasks::TaskStatus,
            api::models::tasks::Priority,
            api::models::tasks::TaskCreate,
            api::models::tasks::TaskUpdate,
            api::models::tasks::TaskResponse,
            api::models::tasks::TaskListResponse,
            api::models::activities::ActivityType,
            api::models::activities::ActivityCreate,
            api::models::activities::ActivityUpdate,
            api::models::activities::ActivityResponse,
            api::models::activities::ActivityListResponse,
            api::models::campaigns::CampaignType,
            api::models::campaigns::CampaignStatus,
            api::models::campaigns::CampaignCreate,
            api::models::campaigns::CampaignUpdate,
            api::models::campaigns::CampaignResponse,
            api::models::campaigns::CampaignListResponse,
            api::models::automations::AutomationTrigger,
            api::models::automations::AutomationStatus,
            api::models::automations::AutomationCreate,
            api::models::automations::AutomationUpdate,
            api::models::automations::AutomationResponse,
            api::models::automations::AutomationListResponse,
            api::models::tickets::TicketStatus,
            api::models::tickets::TicketCreate,
            api::models::tickets::TicketUpdate,
            api::models::tickets::TicketResponse,
            api::models::tickets::TicketListResponse,
            api::models::subscriptions::SubscriptionStatus,
            api::models::subscriptions::BillingCycle,
            api::models::subscriptions::SubscriptionCreate,
            api::models::subscriptions::SubscriptionUpdate,
            api::models::subscriptions::SubscriptionResponse,
            api::models::subscriptions::SubscriptionListResponse,
            api::models::payments::PaymentStatus,
            api::models::payments::PaymentMethod,
            api::models::payments::PaymentCreate,
            api::models::payments::PaymentUpdate,
            api::models::payments::PaymentResponse,
            api::models::payments::PaymentListResponse,
            api::models::dashboard::StatsScope,
            api::models::dashboard::LifecycleStageCount,
            api::models::dashboard::DealStageTotal,
            api::models::dashboard::DashboardStats,
            api::models::dashboard::RecentActivitiesResponse,
            api::models::summaries::UserSummary,
            api::models::summaries::CompanySummary,
            api::models::summaries::ContactSummary,
            api::models::summaries::DealSummary,
            api::models::summaries::SubscriptionSummary,
            api::models::summaries::MessageResponse,
            errors::ErrorBody,
        )
    ),
    tags(
        (name = "auth", description = "Log in, sign up, and fetch the current user."),
        (name = "users", description = "User accounts. Any user can browse the directory; administrators manage accounts and roles."),
        (name = "companies", description = "Organisations you sell to."),
        (name = "contacts", description = "People, optionally linked to a company."),
        (name = "deals", description = "Sales opportunities moving through the pipeline.

Moving a deal to `closed_won` or `closed_lost` stamps `closedAt`."),
        (name = "tasks", description = "Follow-ups assigned to a user, optionally linked to a contact, company or deal."),
        (name = "activities", description = "Logged calls, emails, meetings and notes."),
        (name = "campaigns", description = "Marketing campaigns with budget and funnel counters."),
        (name = "automations", description = "Stored workflow definitions: a trigger, conditions and actions."),
        (name = "tickets", description = "Support requests."),
        (name = "subscriptions", description = "Recurring plans held by contacts or companies."),
        (name = "payments", description = "Individual payments, optionally against a subscription."),
        (name = "dashboard", description = "Pipeline figures and the recent activity feed."),
    ),
    info(
        title = "CRM API",
        version = "1.0.0",
        description = "REST API for contacts, companies, deals, tasks, activities, marketing, support and billing.

## Authentication

All endpoints except login and registration require a token in the `Authorization` header:

```
Authorization: Bearer YOUR_TOKEN
```

## Conventions

- Lists accept `page` and `limit` (max 100) plus a case-insensitive `search` and per-resource filters, and respond with `{ <items>, total, page, totalPages }`.
- `PUT` applies a partial update; send `null` to clear an optional field.
- Errors are returned as `{ \"error\": \"message\" }`.",
    ),
)]
pub struct ApiDoc;
