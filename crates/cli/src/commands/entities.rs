use agora_core::{
    api::ListQuery,
    cache::{EntityCache, FetchMode},
    types::{Entity, SortOrder},
    AgoraContext,
};
use clap::{Subcommand, ValueEnum};
use std::sync::Arc;
use tracing::debug;

use super::utils::{print_info, print_json, require, CliError, CliResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Activity,
    Article,
    Event,
    Prompt,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    Asc,
    Desc,
}

impl From<SortArg> for SortOrder {
    fn from(sort: SortArg) -> Self {
        match sort {
            SortArg::Asc => Self::Asc,
            SortArg::Desc => Self::Desc,
        }
    }
}

#[derive(Subcommand)]
pub enum EntityCommands {
    /// Fetch one record by id
    Get {
        #[arg(value_enum)]
        kind: KindArg,
        id: String,
        /// Bypass the cache
        #[arg(long)]
        force: bool,
    },

    /// List every record of a kind, walking all pages
    List {
        #[arg(value_enum)]
        kind: KindArg,
        /// Maximum number of records; -1 walks every page
        #[arg(long, default_value = "-1", allow_hyphen_values = true)]
        limit: i64,
        #[arg(long)]
        search: Option<String>,
        #[arg(long, value_enum)]
        sort: Option<SortArg>,
    },

    /// Fetch random records of a kind
    Random {
        #[arg(value_enum)]
        kind: KindArg,
        #[arg(default_value = "5")]
        count: usize,
    },

    /// Show the signed-in user
    Me,

    /// List the attendees of an event
    Attendees { event_id: String },

    /// List the signed-in user's notifications
    Notifications,
}

pub async fn handle_entity_command(context: &AgoraContext, command: EntityCommands) -> CliResult<()> {
    match command {
        EntityCommands::Get { kind, id, force } => {
            let mode = FetchMode::from_force(force);
            match kind {
                KindArg::Activity => get(context.activities(), &id, mode).await,
                KindArg::Article => get(context.articles(), &id, mode).await,
                KindArg::Event => get(context.events().cache(), &id, mode).await,
                KindArg::Prompt => get(context.prompts(), &id, mode).await,
                KindArg::User => get(context.users().cache(), &id, mode).await,
            }
        }
        EntityCommands::List { kind, limit, search, sort } => {
            let mut query = ListQuery::from_signed_limit(limit);
            if let Some(search) = search {
                query = query.with_search(search);
            }
            if let Some(sort) = sort {
                query = query.with_sort(sort.into());
            }
            match kind {
                KindArg::Activity => list(context.activities(), &query).await,
                KindArg::Article => list(context.articles(), &query).await,
                KindArg::Event => list(context.events().cache(), &query).await,
                KindArg::Prompt => list(context.prompts(), &query).await,
                KindArg::User => list(context.users().cache(), &query).await,
            }
        }
        EntityCommands::Random { kind, count } => match kind {
            KindArg::Activity => random(context.activities(), count).await,
            KindArg::Article => random(context.articles(), count).await,
            KindArg::Event => random(context.events().cache(), count).await,
            KindArg::Prompt => random(context.prompts(), count).await,
            KindArg::User => random(context.users().cache(), count).await,
        },
        EntityCommands::Me => {
            if !context.session().is_authenticated() {
                return Err(CliError::Config("No session token; pass --token".to_string()));
            }
            let user = context
                .users()
                .current(FetchMode::Cached)
                .await
                .ok_or_else(|| CliError::NotFound("current user".to_string()))?;
            print_json(&*user)
        }
        EntityCommands::Attendees { event_id } => {
            let attendees = context
                .events()
                .attendees(&event_id, FetchMode::Cached)
                .await
                .ok_or_else(|| CliError::NotFound(format!("attendees of event {event_id}")))?;
            print_info(&format!("{} attendees", attendees.len()));
            print_json(attendees.as_slice())
        }
        EntityCommands::Notifications => {
            let notifications = context
                .notifications()
                .list(FetchMode::Cached)
                .await
                .ok_or_else(|| CliError::NotFound("notifications".to_string()))?;
            print_info(&format!("{} unread", context.notifications().unread_count()));
            print_json(notifications.as_slice())
        }
    }
}

async fn get<T: Entity>(cache: &Arc<EntityCache<T>>, id: &str, mode: FetchMode) -> CliResult<()> {
    let entity = cache
        .fetch(id, mode)
        .await
        .ok_or_else(|| CliError::NotFound(format!("{} {id}", T::KIND)))?;
    print_json(&*entity)
}

async fn list<T: Entity>(cache: &Arc<EntityCache<T>>, query: &ListQuery) -> CliResult<()> {
    let items = require(cache.list(query).await)?.unwrap_or_default();
    debug!(kind = %T::KIND, count = items.len(), cached = cache.len(), "listed records");
    print_json(&items.iter().map(|item| &**item).collect::<Vec<&T>>())
}

async fn random<T: Entity>(cache: &Arc<EntityCache<T>>, count: usize) -> CliResult<()> {
    let items = require(cache.random(count).await)?.unwrap_or_default();
    print_json(&items.iter().map(|item| &**item).collect::<Vec<&T>>())
}
