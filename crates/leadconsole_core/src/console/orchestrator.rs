//! Console session state machine.

use crate::console::feeds::{start_notification_feed, start_record_feed, ActiveFeed};
use crate::console::{
    CommandKind, ConsoleContext, ConsoleError, ConsoleEvent, EventOutcome, FeedHealth,
    ServiceHealth,
};
use crate::export::{ExportArtifact, ExportError, ExportFormat, ExportPipeline, ResultSetRenderer};
use crate::filter::facet::Facet;
use crate::filter::{FilterChange, FilterError, FilterPatch, FilterState, FilterStore};
use crate::model::lead::{
    FollowUpTask, LeadDetail, LeadId, LeadIntent, LeadPatch, LeadQuality, LeadRecord, LeadStatus,
};
use crate::notify::{NotificationCategory, NotificationCenter, NotificationId, NotificationItem};
use crate::query::{DispatchSequencer, RequestSeq, ResultPage, TransportError, TransportResult};
use log::{debug, info, warn};
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

/// One admin console session.
///
/// Construct inside a tokio runtime; fetches, commands and realtime pumps
/// run as tasks on that runtime and report back through [`ConsoleEvent`]s
/// that the host feeds to [`Console::handle_event`] (or drains with
/// [`Console::settle`]).
pub struct Console {
    context: ConsoleContext,
    runtime: Handle,
    filters: FilterStore,
    sequencer: DispatchSequencer,
    detail_sequencer: DispatchSequencer,
    awaiting_page: bool,
    results: Option<ResultPage>,
    selected: Option<LeadId>,
    detail: Option<LeadDetail>,
    awaiting_detail: Option<LeadId>,
    assignment_drawer_open: bool,
    in_flight_commands: usize,
    last_error: Option<TransportError>,
    notifications: NotificationCenter,
    exporter: ExportPipeline,
    health: ServiceHealth,
    feeds: Vec<ActiveFeed>,
    active: bool,
    events_tx: mpsc::UnboundedSender<ConsoleEvent>,
    events_rx: mpsc::UnboundedReceiver<ConsoleEvent>,
}

impl Console {
    /// Creates an inactive console.
    ///
    /// # Errors
    /// - `Config` when `context.config` fails validation.
    /// - `NoRuntime` when called outside a tokio runtime.
    pub fn new(context: ConsoleContext) -> Result<Self, ConsoleError> {
        context.config.validate()?;
        let runtime = Handle::try_current().map_err(|_| ConsoleError::NoRuntime)?;

        let mut notifications = NotificationCenter::new(
            context.config.notification_capacity,
            context.preferences.clone(),
        );
        if let Some(surface) = context.notification_surface.clone() {
            notifications = notifications.with_surface(surface);
        }
        let exporter = ExportPipeline::from_config(&context.config);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Ok(Self {
            context,
            runtime,
            filters: FilterStore::new(),
            sequencer: DispatchSequencer::new(),
            detail_sequencer: DispatchSequencer::new(),
            awaiting_page: false,
            results: None,
            selected: None,
            detail: None,
            awaiting_detail: None,
            assignment_drawer_open: false,
            in_flight_commands: 0,
            last_error: None,
            notifications,
            exporter,
            health: ServiceHealth::default(),
            feeds: Vec::new(),
            active: false,
            events_tx,
            events_rx,
        })
    }

    /// Subscribes to realtime feeds and dispatches the first page load.
    ///
    /// A failing subscription marks its feed unavailable; the console keeps
    /// working without it. Calling this on an active console is a no-op.
    pub fn activate(&mut self) -> ServiceHealth {
        if self.active {
            return self.health.clone();
        }

        match self.context.realtime.subscribe_records() {
            Ok(subscription) => {
                let (receiver, guard) = subscription.into_parts();
                self.feeds.push(start_record_feed(
                    &self.runtime,
                    receiver,
                    guard,
                    self.events_tx.clone(),
                ));
                self.health.records = FeedHealth::Live;
            }
            Err(err) => {
                warn!(
                    "event=console_activate module=console status=error feed=records error={}",
                    err
                );
                self.health.records = FeedHealth::Unavailable(err.message);
            }
        }

        match self.context.realtime.subscribe_notifications() {
            Ok(subscription) => {
                let (receiver, guard) = subscription.into_parts();
                self.feeds.push(start_notification_feed(
                    &self.runtime,
                    receiver,
                    guard,
                    self.notifications.clone(),
                ));
                self.health.notifications = FeedHealth::Live;
            }
            Err(err) => {
                warn!(
                    "event=console_activate module=console status=error feed=notifications error={}",
                    err
                );
                self.health.notifications = FeedHealth::Unavailable(err.message);
            }
        }

        self.active = true;
        info!(
            "event=console_activate module=console status=ok feeds={} degraded={}",
            self.feeds.len(),
            self.health.is_degraded()
        );
        self.recompute_and_dispatch();
        self.health.clone()
    }

    /// Releases every realtime subscription. Idempotent.
    pub fn deactivate(&mut self) {
        if !self.active {
            return;
        }
        let released = self.feeds.len();
        for feed in self.feeds.drain(..) {
            feed.shutdown();
        }
        self.health = ServiceHealth::default();
        self.active = false;
        info!(
            "event=console_deactivate module=console status=ok released={}",
            released
        );
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn health(&self) -> &ServiceHealth {
        &self.health
    }

    pub fn filters(&self) -> &FilterState {
        self.filters.state()
    }

    pub fn page(&self) -> u32 {
        self.filters.page()
    }

    pub fn update_filters(&mut self, patch: &FilterPatch) -> RequestSeq {
        let change = self.filters.update_filters(patch);
        self.dispatch_for(change)
    }

    pub fn clear_filters(&mut self) -> RequestSeq {
        let change = self.filters.clear_filters();
        self.dispatch_for(change)
    }

    pub fn set_query(&mut self, text: impl Into<String>) -> RequestSeq {
        let change = self.filters.set_query(text);
        self.dispatch_for(change)
    }

    pub fn set_page(&mut self, page: u32) -> RequestSeq {
        let change = self.filters.set_page(page);
        self.dispatch_for(change)
    }

    pub fn toggle_status(&mut self, status: LeadStatus) -> RequestSeq {
        let change = self.filters.toggle_status(status);
        self.dispatch_for(change)
    }

    pub fn toggle_lead_quality(&mut self, quality: LeadQuality) -> RequestSeq {
        let change = self.filters.toggle_lead_quality(quality);
        self.dispatch_for(change)
    }

    pub fn toggle_intent(&mut self, intent: LeadIntent) -> RequestSeq {
        let change = self.filters.toggle_intent(intent);
        self.dispatch_for(change)
    }

    pub fn toggle_area(&mut self, area: &str) -> Result<RequestSeq, ConsoleError> {
        let change = self.filters.toggle_area(area)?;
        Ok(self.dispatch_for(change))
    }

    pub fn toggle_tag(&mut self, tag: &str) -> Result<RequestSeq, ConsoleError> {
        let change = self.filters.toggle_tag(tag)?;
        Ok(self.dispatch_for(change))
    }

    /// Toggles a facet addressed by wire names (`"status"`, `"completed"`).
    ///
    /// Unknown facets or values are rejected before any state changes and
    /// nothing is dispatched.
    pub fn toggle_facet_by_name(
        &mut self,
        facet: &str,
        value: &str,
    ) -> Result<RequestSeq, ConsoleError> {
        let facet =
            Facet::parse(facet).ok_or_else(|| FilterError::UnknownFacet(facet.to_string()))?;
        let change = self.filters.toggle_facet_value(facet, value)?;
        Ok(self.dispatch_for(change))
    }

    /// Dispatches the current filter and page to the executor.
    ///
    /// Every mutating operation ends here. The returned sequence number is
    /// the only one whose response will be applied.
    pub fn recompute_and_dispatch(&mut self) -> RequestSeq {
        let seq = self.sequencer.next();
        self.awaiting_page = true;

        let executor = Arc::clone(&self.context.executor);
        let filters = self.filters.state().clone();
        let page = self.filters.page();
        let page_size = self.context.config.page_size;
        debug!(
            "event=page_dispatch module=console status=start seq={} page={} revision={}",
            seq,
            page,
            self.filters.revision()
        );

        self.spawn_reporting(async move {
            let result = executor.fetch_page(&filters, page, page_size).await;
            ConsoleEvent::PageLoaded { seq, result }
        });
        seq
    }

    pub fn latest_seq(&self) -> RequestSeq {
        self.sequencer.latest()
    }

    /// Whether the latest page request is still unanswered.
    pub fn is_loading(&self) -> bool {
        self.awaiting_page
    }

    pub fn results(&self) -> Option<&ResultPage> {
        self.results.as_ref()
    }

    pub fn selected(&self) -> Option<LeadId> {
        self.selected
    }

    pub fn selected_record(&self) -> Option<&LeadRecord> {
        let id = self.selected?;
        self.results
            .as_ref()?
            .records
            .iter()
            .find(|record| record.id == id)
    }

    /// Detail summary of the selected lead, once loaded.
    pub fn detail(&self) -> Option<&LeadDetail> {
        self.detail.as_ref()
    }

    /// Selects a lead on the current page and loads its detail summary.
    pub fn select_record(&mut self, id: LeadId) -> Result<(), ConsoleError> {
        let on_page = self
            .results
            .as_ref()
            .map_or(false, |results| results.contains(id));
        if !on_page {
            return Err(ConsoleError::NotOnPage(id));
        }
        if self.selected != Some(id) {
            self.selected = Some(id);
            self.detail = None;
            self.assignment_drawer_open = false;
        }
        self.request_detail(id);
        Ok(())
    }

    /// Opens the assignment drawer for the selected lead.
    ///
    /// Returns `false` when nothing is selected.
    pub fn open_assignment_drawer(&mut self) -> bool {
        self.assignment_drawer_open = self.selected.is_some();
        self.assignment_drawer_open
    }

    pub fn close_assignment_drawer(&mut self) {
        self.assignment_drawer_open = false;
    }

    pub fn assignment_drawer_open(&self) -> bool {
        self.assignment_drawer_open
    }

    /// Assigns (or with `None` unassigns) an agent and closes the drawer.
    pub fn assign_agent(&mut self, id: LeadId, agent: Option<&str>) {
        self.assignment_drawer_open = false;
        let gateway = Arc::clone(&self.context.mutations);
        let agent = agent.map(str::to_string);
        self.spawn_command(CommandKind::AssignAgent, id, async move {
            gateway.assign_agent(id, agent.as_deref()).await
        });
    }

    pub fn schedule_follow_up(&mut self, id: LeadId, task: FollowUpTask) {
        let gateway = Arc::clone(&self.context.mutations);
        self.spawn_command(CommandKind::ScheduleFollowUp, id, async move {
            gateway.schedule_follow_up(id, &task).await
        });
    }

    pub fn update_field(&mut self, id: LeadId, patch: LeadPatch) -> Result<(), ConsoleError> {
        if patch.is_empty() {
            return Err(ConsoleError::EmptyPatch);
        }
        let gateway = Arc::clone(&self.context.mutations);
        self.spawn_command(CommandKind::UpdateField, id, async move {
            gateway.update_record(id, &patch).await
        });
        Ok(())
    }

    pub fn in_flight_commands(&self) -> usize {
        self.in_flight_commands
    }

    /// Most recent transport failure surfaced to the console.
    pub fn last_error(&self) -> Option<&TransportError> {
        self.last_error.as_ref()
    }

    pub fn clear_error(&mut self) -> Option<TransportError> {
        self.last_error.take()
    }

    /// Newest-first notification snapshot.
    pub fn notifications(&self) -> Vec<NotificationItem> {
        self.notifications.items()
    }

    pub fn notification_center(&self) -> &NotificationCenter {
        &self.notifications
    }

    pub fn dismiss_notification(&self, id: NotificationId) -> bool {
        self.notifications.dismiss(id)
    }

    pub fn clear_notifications(&self) -> usize {
        self.notifications.clear()
    }

    pub fn set_notification_enabled(&self, category: NotificationCategory, enabled: bool) {
        self.notifications.set_enabled(category, enabled);
    }

    /// Adds or replaces the renderer for its format.
    pub fn register_renderer(&mut self, renderer: Arc<dyn ResultSetRenderer>) {
        self.exporter.register(renderer);
    }

    /// Exports every record matching the filter as it is right now.
    pub async fn export_results(
        &self,
        format: ExportFormat,
    ) -> Result<ExportArtifact, ExportError> {
        let filters = self.filters.state().clone();
        let executor = Arc::clone(&self.context.executor);
        self.exporter
            .export_results(executor.as_ref(), format, &filters)
            .await
    }

    /// Same as [`Console::export_results`] with a format name.
    pub async fn export_by_name(&self, format: &str) -> Result<ExportArtifact, ExportError> {
        let format: ExportFormat = format.parse()?;
        self.export_results(format).await
    }

    /// Awaits the next completed background event.
    pub async fn next_event(&mut self) -> Option<ConsoleEvent> {
        self.events_rx.recv().await
    }

    /// Applies one completed background event.
    pub fn handle_event(&mut self, event: ConsoleEvent) -> EventOutcome {
        match event {
            ConsoleEvent::PageLoaded { seq, result } => self.apply_page(seq, result),
            ConsoleEvent::DetailLoaded { seq, id, result } => self.apply_detail(seq, id, result),
            ConsoleEvent::RecordChanged(change) => {
                if !self.active {
                    debug!(
                        "event=record_changed module=console status=skip reason=inactive lead_id={}",
                        change.id
                    );
                    return EventOutcome::Discarded;
                }
                self.health.records = FeedHealth::Live;
                debug!(
                    "event=record_changed module=console status=ok lead_id={} kind={:?}",
                    change.id, change.kind
                );
                self.recompute_and_dispatch();
                EventOutcome::Applied
            }
            ConsoleEvent::RecordFeedFailed(err) => {
                warn!(
                    "event=record_feed module=console status=error error={}",
                    err
                );
                self.health.records = FeedHealth::Unavailable(err.message);
                EventOutcome::Applied
            }
            ConsoleEvent::CommandFinished {
                command,
                id,
                result,
            } => self.apply_command_result(command, id, result),
        }
    }

    /// Applies every event that is already available without waiting.
    pub fn drain_ready(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Processes events until no page, detail or command is outstanding.
    pub async fn settle(&mut self) {
        while self.is_busy() {
            let Some(event) = self.events_rx.recv().await else {
                return;
            };
            self.handle_event(event);
        }
    }

    fn is_busy(&self) -> bool {
        self.awaiting_page || self.awaiting_detail.is_some() || self.in_flight_commands > 0
    }

    fn dispatch_for(&mut self, change: FilterChange) -> RequestSeq {
        debug!(
            "event=filter_change module=console status=ok kind={:?} revision={} page={}",
            change.kind, change.revision, change.page
        );
        self.recompute_and_dispatch()
    }

    fn apply_page(&mut self, seq: RequestSeq, result: TransportResult<ResultPage>) -> EventOutcome {
        if !self.sequencer.is_current(seq) {
            debug!(
                "event=page_response module=console status=skip reason=stale seq={} latest={}",
                seq,
                self.sequencer.latest()
            );
            return EventOutcome::Discarded;
        }
        self.awaiting_page = false;

        match result {
            Ok(page) => {
                debug!(
                    "event=page_response module=console status=ok seq={} rows={} total={}",
                    seq,
                    page.records.len(),
                    page.total_count
                );
                self.results = Some(page);
                self.reconcile_selection();
            }
            Err(err) => {
                warn!(
                    "event=page_response module=console status=error seq={} error={}",
                    seq, err
                );
                self.results = None;
                self.clear_selection();
                self.last_error = Some(err);
            }
        }
        EventOutcome::Applied
    }

    fn reconcile_selection(&mut self) {
        let Some(results) = self.results.as_ref() else {
            return;
        };
        let next = match self.selected {
            Some(id) if results.contains(id) => Some(id),
            _ => results.first_id(),
        };
        if next == self.selected {
            return;
        }

        match next {
            Some(id) => {
                self.selected = Some(id);
                self.detail = None;
                self.assignment_drawer_open = false;
                self.request_detail(id);
            }
            None => self.clear_selection(),
        }
    }

    /// Drops selection, detail and drawer; in-flight details become stale.
    fn clear_selection(&mut self) {
        self.selected = None;
        self.detail = None;
        self.assignment_drawer_open = false;
        self.awaiting_detail = None;
        self.detail_sequencer.next();
    }

    fn request_detail(&mut self, id: LeadId) {
        let seq = self.detail_sequencer.next();
        self.awaiting_detail = Some(id);
        let executor = Arc::clone(&self.context.executor);
        self.spawn_reporting(async move {
            let result = executor.fetch_detail(id).await;
            ConsoleEvent::DetailLoaded { seq, id, result }
        });
    }

    fn apply_detail(
        &mut self,
        seq: RequestSeq,
        id: LeadId,
        result: TransportResult<Option<LeadDetail>>,
    ) -> EventOutcome {
        if !self.detail_sequencer.is_current(seq) {
            debug!(
                "event=detail_response module=console status=skip reason=stale seq={} latest={}",
                seq,
                self.detail_sequencer.latest()
            );
            return EventOutcome::Discarded;
        }
        self.awaiting_detail = None;
        if self.selected != Some(id) {
            debug!("event=detail_response module=console status=skip reason=not_selected");
            return EventOutcome::Discarded;
        }

        match result {
            Ok(detail) => self.detail = detail,
            Err(err) => {
                warn!(
                    "event=detail_response module=console status=error error={}",
                    err
                );
                self.last_error = Some(err);
            }
        }
        EventOutcome::Applied
    }

    fn spawn_command<F>(&mut self, command: CommandKind, id: LeadId, call: F)
    where
        F: Future<Output = TransportResult<()>> + Send + 'static,
    {
        self.in_flight_commands += 1;
        info!(
            "event=command_dispatch module=console status=start command={} lead_id={} in_flight={}",
            command, id, self.in_flight_commands
        );
        self.spawn_reporting(async move {
            let result = call.await;
            ConsoleEvent::CommandFinished {
                command,
                id,
                result,
            }
        });
    }

    fn apply_command_result(
        &mut self,
        command: CommandKind,
        id: LeadId,
        result: TransportResult<()>,
    ) -> EventOutcome {
        self.in_flight_commands = self.in_flight_commands.saturating_sub(1);
        match result {
            Ok(()) => info!(
                "event=command_finish module=console status=ok command={} lead_id={}",
                command, id
            ),
            Err(err) => {
                warn!(
                    "event=command_finish module=console status=error command={} lead_id={} error={}",
                    command, id, err
                );
                self.last_error = Some(err);
            }
        }

        self.recompute_and_dispatch();
        if self.selected == Some(id) {
            self.request_detail(id);
        }
        EventOutcome::Applied
    }

    fn spawn_reporting<F>(&self, work: F)
    where
        F: Future<Output = ConsoleEvent> + Send + 'static,
    {
        let events = self.events_tx.clone();
        self.runtime.spawn(async move {
            let event = work.await;
            // The console owns the receiver; a send error means it is gone.
            let _ = events.send(event);
        });
    }
}

impl Drop for Console {
    fn drop(&mut self) {
        self.deactivate();
    }
}
