use std::{process, sync::Arc};

use serde::Serialize;
use tipcat::{
    application::{
        error::AppError,
        favorites::FavoritesService,
        repos::{
            CategoriesRepo, CategoriesWriteRepo, FavoritesRepo, TipsRepo, TipsWriteRepo, UsersRepo,
        },
        tips::TipService,
        views::ViewService,
    },
    cache::{CacheConfig, CacheInvalidator, CacheStore, MemoryCacheStore},
    config::{self, Command, Settings},
    infra::{
        db::PostgresRepositories, error::InfraError, memory::InMemoryRepositories, snapshot,
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, kind = error.kind(), "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, kind = error.kind(), "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli().map_err(|err| {
        AppError::infrastructure(format!("failed to load configuration: {err}"))
    })?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match cli_args.command {
        Command::Migrate => run_migrations(&settings).await,
        command => {
            let context = build_context(&settings).await?;
            run_query(&context, command).await
        }
    }
}

/// Services wired over one repository adapter.
struct CatalogContext {
    tips: TipService,
    favorites: FavoritesService,
    views: ViewService,
}

impl CatalogContext {
    fn new<R>(repositories: Arc<R>, settings: &Settings) -> Self
    where
        R: TipsRepo
            + TipsWriteRepo
            + CategoriesRepo
            + CategoriesWriteRepo
            + FavoritesRepo
            + UsersRepo
            + 'static,
    {
        let cache_config = CacheConfig::from(&settings.cache);
        let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new(&cache_config));
        let invalidator = Arc::new(CacheInvalidator::new(store.clone()));
        let limits = settings.query.limits();

        let tips = TipService::new(
            repositories.clone(),
            repositories.clone(),
            repositories.clone(),
            invalidator,
            limits,
        );
        let favorites = FavoritesService::new(
            repositories.clone(),
            repositories.clone(),
            repositories.clone(),
            limits,
        );
        let views = ViewService::new(
            repositories.clone(),
            repositories.clone(),
            repositories,
            store,
            cache_config,
        );

        Self {
            tips,
            favorites,
            views,
        }
    }
}

async fn build_context(settings: &Settings) -> Result<CatalogContext, AppError> {
    if let Some(path) = settings.catalog.snapshot.as_ref() {
        let seed = snapshot::load_snapshot(path).await?;
        info!(
            path = %path.display(),
            tips = seed.tips.len(),
            categories = seed.categories.len(),
            "Catalog snapshot loaded"
        );
        let repositories = Arc::new(InMemoryRepositories::from_seed(seed));
        return Ok(CatalogContext::new(repositories, settings));
    }

    let repositories = Arc::new(connect_database(settings).await?);
    Ok(CatalogContext::new(repositories, settings))
}

async fn connect_database(settings: &Settings) -> Result<PostgresRepositories, AppError> {
    let url = settings.database.url.as_deref().ok_or_else(|| {
        InfraError::configuration("either --catalog or --database-url must be provided")
    })?;

    let pool = PostgresRepositories::connect(url, settings.database.max_connections.get())
        .await
        .map_err(|err| InfraError::database(err.to_string()))?;
    Ok(PostgresRepositories::new(pool))
}

async fn run_migrations(settings: &Settings) -> Result<(), AppError> {
    let repositories = connect_database(settings).await?;
    PostgresRepositories::run_migrations(repositories.pool())
        .await
        .map_err(|err| InfraError::database(err.to_string()))?;
    info!("Database migrations applied");
    Ok(())
}

async fn run_query(context: &CatalogContext, command: Command) -> Result<(), AppError> {
    match command {
        Command::Search(args) => print_json(&context.tips.query(&args.to_query()).await?),
        Command::Favorites(args) => print_json(
            &context
                .favorites
                .list(args.user_id, &args.query.to_query())
                .await?,
        ),
        Command::Categories => print_json(&context.views.category_list().await?),
        Command::Category(args) => print_json(&context.views.category_detail(args.id).await?),
        Command::Dashboard => print_json(&context.views.dashboard().await?),
        Command::Migrate => Err(AppError::validation(
            "migrate does not read the catalog",
        )),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::infrastructure(format!("failed to encode output: {err}")))?;
    println!("{rendered}");
    Ok(())
}
