// bases/download_cli/src/app.rs
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use color_eyre::{eyre::eyre, Result};
use download_service::{
    DownloadService, DownloadStatus, QualityOption, RecordId, RecordStore,
};
use media_downloader::{Extractor, YtDlp, YtDlpConfig};
use tokio::io::{AsyncBufReadExt, BufReader, Stdin};
use tracing::warn;

use crate::args::{Args, Command, FormatChoice};
use crate::output::{parse_choice, Choice, OutputHandler, TableView};

const REFRESH_INTERVAL: Duration = Duration::from_secs(1);

pub struct App {
    args: Args,
    output: OutputHandler,
}

impl App {
    pub fn new(args: Args) -> Self {
        let output = OutputHandler::new(args.verbose);
        Self { args, output }
    }

    pub async fn run(&self) -> Result<()> {
        match &self.args.command {
            Command::Formats { url } => {
                let service = self.lookup_service();
                let listing = service.list_qualities(url).await?;
                self.output.print_qualities(&listing);
            }
            Command::Resolve { url, format_id } => {
                let service = self.lookup_service();
                let resolved = service.resolve(url, format_id).await?;
                self.output.print_resolved(&resolved);
            }
            Command::Get {
                urls,
                format,
                best,
                output_dir,
            } => {
                let service = self.service(output_dir)?;
                service.check_extractor().await?;
                let choice = FormatChoice::from_flags(format.as_deref(), *best);
                self.get(&service, urls, &choice).await?;
            }
            Command::History => {
                let service = self.service(Path::new("."))?;
                self.output.print_history(&service.history());
            }
        }

        Ok(())
    }

    pub fn print_error(&self, error: &color_eyre::Report) {
        self.output.print_error(error);
    }

    /// Service backed by the record store in the data dir
    fn service(&self, download_dir: &Path) -> Result<DownloadService> {
        let records = RecordStore::open(&self.args.data_dir)?;
        Ok(DownloadService::new(
            self.extractor(),
            records,
            download_dir.to_path_buf(),
        ))
    }

    /// Service for commands that never write a record; leaves the data dir alone
    fn lookup_service(&self) -> DownloadService {
        DownloadService::new(
            self.extractor(),
            RecordStore::in_memory(),
            PathBuf::from("."),
        )
    }

    fn extractor(&self) -> Arc<dyn Extractor> {
        Arc::new(YtDlp::new(YtDlpConfig::from(self.args.extractor.clone())))
    }

    async fn get(
        &self,
        service: &DownloadService,
        urls: &[String],
        choice: &FormatChoice,
    ) -> Result<()> {
        let mut stdin = BufReader::new(tokio::io::stdin());
        let mut started = Vec::new();
        let mut not_started = 0usize;

        for url in urls {
            let outcome = match choice {
                FormatChoice::Fixed(id) => service.start_download(url, Some(id.as_str())).await,
                FormatChoice::ExtractorDefault => service.start_download(url, None).await,
                FormatChoice::Prompt => match self.pick_quality(service, url, &mut stdin).await? {
                    Some((title, option)) => {
                        service.start_listed_download(url, &title, &option).await
                    }
                    None => {
                        not_started += 1;
                        continue;
                    }
                },
            };

            match outcome {
                Ok(ticket) => started.push(ticket.id()),
                Err(e) => {
                    self.output.print_skipped(url, &e);
                    not_started += 1;
                }
            }
        }

        if !started.is_empty() {
            self.watch(service, &started).await;
        }
        service.wait_all().await;

        let unfinished = started
            .iter()
            .filter_map(|id| service.progress(*id).ok())
            .filter(|record| record.status != DownloadStatus::Completed)
            .count()
            + not_started;
        if unfinished > 0 {
            return Err(eyre!(
                "{} of {} downloads did not complete",
                unfinished,
                urls.len()
            ));
        }
        Ok(())
    }

    /// List qualities and ask which one to fetch; `None` skips the URL
    ///
    /// Returns the listed title with the chosen option so the download can
    /// start from them directly.
    async fn pick_quality(
        &self,
        service: &DownloadService,
        url: &str,
        stdin: &mut BufReader<Stdin>,
    ) -> Result<Option<(String, QualityOption)>> {
        let listing = match service.list_qualities(url).await {
            Ok(listing) => listing,
            Err(e) => {
                self.output.print_skipped(url, &e);
                return Ok(None);
            }
        };
        self.output.print_qualities(&listing);

        loop {
            self.output.print_prompt(listing.options.len());
            let mut line = String::new();
            if stdin.read_line(&mut line).await? == 0 {
                return Ok(None);
            }
            match parse_choice(&line, listing.options.len()) {
                Ok(Choice::Pick(index)) => {
                    let title = listing.title.clone();
                    return Ok(listing
                        .options
                        .into_iter()
                        .nth(index)
                        .map(|option| (title, option)));
                }
                Ok(Choice::Skip) => return Ok(None),
                Err(message) => self.output.print_invalid_choice(&message),
            }
        }
    }

    /// Redraw the table every second until every row is settled; Ctrl-C cancels
    async fn watch(&self, service: &DownloadService, ids: &[RecordId]) {
        let mut table = TableView::default();
        let mut ticker = tokio::time::interval(REFRESH_INTERVAL);
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        let mut listening = true;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                signal = &mut ctrl_c, if listening => {
                    listening = false;
                    match signal {
                        Ok(()) => self.output.print_cancelling(service.cancel_all()),
                        Err(e) => warn!("Could not listen for Ctrl-C: {}", e),
                    }
                }
            }

            let rows: Vec<_> = ids
                .iter()
                .filter_map(|id| service.progress(*id).ok())
                .collect();
            table.redraw(&rows, service.active_count());

            if rows.iter().all(|record| record.status.is_terminal()) {
                break;
            }
        }
    }
}
