mod cache;
mod cms;
mod dates;
mod listing;
mod navigation;
mod output;
mod post;
mod reading;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use cms::{Client, CmsError, Query};
use listing::{LoadMore, PostListing, PostPage};

const DOCUMENT_TYPE: &str = "posts";

#[derive(Parser, Debug)]
#[clap(
    version,
    about = "Browse a Prismic-backed blog from the terminal: paginated post listing and post pages with reading time"
)]
struct Args {
    /// Repository API endpoint (e.g. https://myblog.cdn.prismic.io/api/v2)
    #[arg(long, env = "SPACEWALKER_API_URL")]
    api_url: String,

    /// Preview ref token; implies uncached rendering
    #[arg(long, env = "SPACEWALKER_PREVIEW_REF")]
    preview_ref: Option<String>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<String>,

    /// Skip the rendered-page cache entirely
    #[arg(long)]
    no_cache: bool,

    /// Revalidation interval for the listing page, in seconds
    #[arg(long, default_value_t = 60 * 60)]
    listing_ttl_secs: u64,

    /// Revalidation interval for post pages, in seconds
    #[arg(long, default_value_t = 60 * 60 * 24)]
    post_ttl_secs: u64,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the post listing, following the continuation cursor on demand
    List {
        /// Posts per page
        #[arg(long, default_value_t = 20)]
        page_size: usize,

        /// Extra pages to load after the first
        #[arg(long, default_value_t = 0)]
        load_more: usize,
    },
    /// Fetch one post by slug, with reading time and prev/next links
    Show {
        /// The post's uid
        slug: String,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let host = url::Url::parse(&args.api_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string());

    if args.verbose {
        eprintln!("Repository: {}", host);
    }

    let rendered = match &args.command {
        Command::List {
            page_size,
            load_more,
        } => render_listing_page(&args, &host, *page_size, *load_more)?,
        Command::Show { slug } => render_post_page(&args, &host, slug)?,
    };

    if let Some(path) = &args.output {
        std::fs::write(path, &rendered)
            .with_context(|| format!("Failed to write output to {}", path))?;
        eprintln!("Output written to {}", path);
    } else {
        print!("{}", rendered);
    }

    Ok(())
}

/// Preview renders are never cached; they track a moving ref.
fn page_cache(args: &Args, host: &str, kind: &str, ttl_secs: u64) -> Result<Option<cache::PageCache>> {
    if args.no_cache || args.preview_ref.is_some() {
        return Ok(None);
    }
    Ok(Some(cache::PageCache::new(host, kind, ttl_secs)?))
}

fn render_listing_page(args: &Args, host: &str, page_size: usize, load_more: usize) -> Result<String> {
    let cache = page_cache(args, host, "listing", args.listing_ttl_secs)?;
    let key = format!("list-{}-{}", page_size, load_more);

    if let Some(cache) = &cache {
        if let Some(page) = cache.load_fresh(&key)? {
            if args.verbose {
                eprintln!("Listing cached, skipping fetch");
            }
            return Ok(page.rendered);
        }
    }

    let client = Client::new(&args.api_url, args.preview_ref.as_deref())
        .context("Failed to connect to the repository")?;

    let mut query = Query::for_type(DOCUMENT_TYPE);
    query.page_size = page_size;
    query.fetch = vec![
        format!("{DOCUMENT_TYPE}.title"),
        format!("{DOCUMENT_TYPE}.subtitle"),
        format!("{DOCUMENT_TYPE}.author"),
    ];
    query.orderings = Some("document.first_publication_date desc".to_string());

    if args.verbose {
        eprintln!("Fetching page 1 (page size {})...", page_size);
    }
    let response = client.query(&query).context("Failed to fetch the post listing")?;
    let first_page = PostPage::from_response(&response)?;
    let mut posts = PostListing::new(first_page);

    let complete = load_extra_pages(&mut posts, &client, load_more, args.verbose);

    let rendered = output::render_listing(&posts)?;
    // A partial listing is still shown, but never cached: caching it would
    // serve the truncated page until expiry instead of retrying the failed
    // fetch on the next invocation.
    if complete {
        if let Some(cache) = &cache {
            cache.save(&key, &rendered)?;
        }
    }
    Ok(rendered)
}

/// Follow the continuation cursor up to `pages` more times. Returns whether
/// the listing is complete for its key: every requested page arrived, or
/// the cursor ran out first. A transient failure keeps the pages already
/// accumulated and reports the failed page on stderr.
fn load_extra_pages(
    posts: &mut PostListing,
    fetcher: &impl listing::PageFetcher,
    pages: usize,
    verbose: bool,
) -> bool {
    for n in 0..pages {
        match posts.load_more(fetcher) {
            Ok(LoadMore::Appended(count)) => {
                if verbose {
                    eprintln!("Loaded page {} ({} posts)", n + 2, count);
                }
            }
            Ok(LoadMore::NoMorePages) => {
                if verbose {
                    eprintln!("No more pages");
                }
                break;
            }
            Ok(LoadMore::AlreadyLoading) => unreachable!("load_more runs to completion"),
            Err(e) => {
                eprintln!("Failed to load page {}: {:#}", n + 2, anyhow::Error::new(e));
                return false;
            }
        }
    }
    true
}

fn render_post_page(args: &Args, host: &str, slug: &str) -> Result<String> {
    let cache = page_cache(args, host, "posts", args.post_ttl_secs)?;

    if let Some(cache) = &cache {
        if let Some(page) = cache.load_fresh(slug)? {
            if args.verbose {
                eprintln!("Post {} cached, skipping fetch", slug);
            }
            return Ok(page.rendered);
        }
    }

    let client = Client::new(&args.api_url, args.preview_ref.as_deref())
        .context("Failed to connect to the repository")?;

    if args.verbose {
        eprintln!("Fetching post {}...", slug);
    }
    let raw = match client.get_by_uid(DOCUMENT_TYPE, slug) {
        Ok(raw) => raw,
        Err(CmsError::NotFound) => anyhow::bail!("No post found with slug {:?}", slug),
        Err(e) => return Err(e).context("Failed to fetch the post"),
    };

    let detail = post::PostDetail::from_raw(&raw)
        .with_context(|| format!("Post {:?} has a malformed record", slug))?;
    let links = navigation::resolve(&client, DOCUMENT_TYPE, &raw)?;

    let rendered = output::render_post(&detail, &links)?;
    if let Some(cache) = &cache {
        cache.save(slug, &rendered)?;
    }
    Ok(rendered)
}
