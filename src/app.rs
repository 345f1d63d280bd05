use crate::api::{ProductId, ProductSummary};
use crate::cart::{Cart, COLORS, SIZES};
use crate::checkout::{place_order, CheckoutForm, Country, OrderReceipt, OrderSummary};
use crate::dispatch::WorkflowDispatcher;
use crate::event::AppEvent;
use crate::session::AuthSession;
use crate::theme::Theme;
use crate::workflow::{WorkflowState, WorkflowStatus};
use eframe::egui::{self, Color32, RichText, ScrollArea};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const BUSY_REPAINT: Duration = Duration::from_millis(200);

pub struct AirisApp {
    rx: Receiver<AppEvent>,
    dispatcher: WorkflowDispatcher,
    theme: Theme,
    session: Option<AuthSession>,
    email_input: String,
    password_input: String,
    login_pending: bool,
    catalog: Vec<ProductSummary>,
    catalog_filter: String,
    catalog_loading: bool,
    cart: Cart,
    // Size and color picked on each catalog card.
    variant_choice: HashMap<ProductId, (Option<String>, Option<String>)>,
    checkout_open: bool,
    checkout_form: CheckoutForm,
    checkout_error: Option<String>,
    last_receipt: Option<OrderReceipt>,
    photo_path_input: String,
    last_error: Option<String>,
    diagnostics_log: Vec<String>,
}

enum CartAction {
    Increment(usize),
    Decrement(usize),
    Remove(usize),
    Clear,
    Checkout,
}

impl AirisApp {
    pub fn new(
        rx: Receiver<AppEvent>,
        dispatcher: WorkflowDispatcher,
        session: Option<AuthSession>,
        warnings: Vec<String>,
    ) -> Self {
        let mut app = Self {
            rx,
            dispatcher,
            theme: Theme::default(),
            session,
            email_input: String::new(),
            password_input: String::new(),
            login_pending: false,
            catalog: Vec::new(),
            catalog_filter: String::new(),
            catalog_loading: false,
            cart: Cart::default(),
            variant_choice: HashMap::new(),
            checkout_open: false,
            checkout_form: CheckoutForm::default(),
            checkout_error: None,
            last_receipt: None,
            photo_path_input: String::new(),
            last_error: None,
            diagnostics_log: Vec::new(),
        };

        for warning in warnings {
            app.log_diagnostic(warning);
        }
        if app.session.is_some() {
            app.on_session_started();
        }
        app
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    fn timestamp() -> String {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(duration) => duration.as_secs().to_string(),
            Err(_) => "0".to_string(),
        }
    }

    fn log_diagnostic(&mut self, message: impl Into<String>) {
        self.diagnostics_log
            .push(format!("[{}] {}", Self::timestamp(), message.into()));
    }

    fn on_session_started(&mut self) {
        self.catalog_loading = true;
        self.dispatcher.load_catalog();
        if self.dispatcher.tracker().status() == WorkflowStatus::FetchingMood {
            self.log_diagnostic("resuming mood analysis for the uploaded photo");
            self.dispatcher.fetch_mood();
        }
    }

    fn status_message(state: &WorkflowState) -> String {
        match state.status {
            WorkflowStatus::Idle => "Upload a photo to get personalized looks".to_string(),
            WorkflowStatus::Uploading => "Uploading your photo...".to_string(),
            WorkflowStatus::FetchingMood => "Analyzing your mood...".to_string(),
            WorkflowStatus::ProductsReady => match state.mood_phrase.as_deref() {
                Some(phrase) => format!(
                    "Your mood: {phrase}. {} products picked for you",
                    state.candidate_products.len()
                ),
                None => format!("{} products picked for you", state.candidate_products.len()),
            },
            WorkflowStatus::Generating => format!(
                "Generating your looks ({}/{})",
                state.progress.current, state.progress.total
            ),
            WorkflowStatus::Completed => format!(
                "{} personalized looks are ready",
                state.generated_results.len()
            ),
        }
    }

    fn drain_events(&mut self, ctx: &egui::Context) {
        loop {
            match self.rx.try_recv() {
                Ok(event) => {
                    self.apply_event(event);
                    ctx.request_repaint();
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.log_diagnostic("event channel disconnected");
                    break;
                }
            }
        }
    }

    fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::LoggedIn(session) => {
                self.log_diagnostic(format!(
                    "signed in as {} (token issued at {})",
                    session.email, session.created_at
                ));
                self.session = Some(session);
                self.login_pending = false;
                self.password_input.clear();
                self.last_error = None;
                self.on_session_started();
            }
            AppEvent::LoggedOut => {
                self.session = None;
                self.catalog.clear();
                self.cart.clear();
                self.variant_choice.clear();
                self.checkout_open = false;
                self.checkout_form = CheckoutForm::default();
                self.checkout_error = None;
                self.last_receipt = None;
                self.last_error = None;
                self.log_diagnostic("signed out");
            }
            AppEvent::LoginFailed(message) => {
                self.login_pending = false;
                self.log_diagnostic(format!("login failed: {message}"));
                self.last_error = Some(format!("Login failed: {message}"));
            }
            AppEvent::CatalogLoaded(mut products) => {
                self.catalog_loading = false;
                products.sort_by(|a, b| {
                    b.product_rank
                        .unwrap_or(0.0)
                        .total_cmp(&a.product_rank.unwrap_or(0.0))
                });
                self.log_diagnostic(format!("catalog loaded: {} products", products.len()));
                self.catalog = products;
            }
            AppEvent::CatalogFailed(message) => {
                self.catalog_loading = false;
                self.log_diagnostic(format!("catalog failed: {message}"));
            }
            AppEvent::WorkflowAdvanced(status) => {
                self.last_error = None;
                self.log_diagnostic(format!("workflow status: {status}"));
            }
            AppEvent::WorkflowFailed { operation, message } => {
                self.log_diagnostic(format!("{operation} failed: {message}"));
                self.last_error = Some(message);
            }
            AppEvent::Diagnostic(message) => self.log_diagnostic(message),
        }
    }

    fn render_top_bar(&mut self, ctx: &egui::Context, state: &WorkflowState) {
        let mut login_clicked = false;
        let mut logout_clicked = false;

        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.strong("Airis");
                ui.separator();
                ui.label(
                    RichText::new(state.status.as_str())
                        .color(self.theme.status_color(state.status)),
                );
                ui.separator();
                ui.label(format!("Cart ({})", self.cart.item_count()));
                ui.separator();

                match &self.session {
                    Some(session) => {
                        ui.label(&session.email);
                        logout_clicked = ui.button("Sign out").clicked();
                    }
                    None => {
                        ui.add(
                            egui::TextEdit::singleline(&mut self.email_input)
                                .desired_width(180.0)
                                .hint_text("email"),
                        );
                        ui.add(
                            egui::TextEdit::singleline(&mut self.password_input)
                                .desired_width(140.0)
                                .password(true)
                                .hint_text("password"),
                        );
                        let ready = !self.login_pending && !self.email_input.trim().is_empty();
                        login_clicked = ui
                            .add_enabled(ready, egui::Button::new("Sign in"))
                            .clicked();
                    }
                }
            });
        });

        if login_clicked {
            self.login_pending = true;
            self.dispatcher.login(
                self.email_input.trim().to_string(),
                self.password_input.clone(),
            );
        }
        if logout_clicked {
            self.dispatcher.logout();
        }
    }

    fn render_left_panel(&mut self, ctx: &egui::Context) {
        let mut added: Option<(ProductSummary, String, String)> = None;
        let mut reload = false;

        egui::SidePanel::left("catalog_panel")
            .resizable(true)
            .default_width(280.0)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("Catalog");
                    reload = ui
                        .add_enabled(
                            self.session.is_some() && !self.catalog_loading,
                            egui::Button::new("Reload"),
                        )
                        .clicked();
                });
                ui.add(
                    egui::TextEdit::singleline(&mut self.catalog_filter)
                        .desired_width(f32::INFINITY)
                        .hint_text("Search products"),
                );
                ui.separator();

                if self.catalog_loading {
                    ui.spinner();
                } else if self.catalog.is_empty() {
                    ui.label(RichText::new("No products loaded").color(self.theme.text_muted));
                }

                ScrollArea::vertical().id_salt("catalog_list").show(ui, |ui| {
                    for product in self
                        .catalog
                        .iter()
                        .filter(|product| product.matches(&self.catalog_filter))
                    {
                        self.theme.card_frame().show(ui, |ui| {
                            ui.strong(&product.product_name);
                            ui.label(format!("{:.2} €", product.product_price));
                            if let Some(description) = &product.product_description {
                                ui.label(RichText::new(description).small());
                            }
                            if !product.product_characteristics.is_empty() {
                                let shown: Vec<&str> = product
                                    .product_characteristics
                                    .iter()
                                    .take(3)
                                    .map(String::as_str)
                                    .collect();
                                ui.label(
                                    RichText::new(shown.join(" · "))
                                        .small()
                                        .color(self.theme.text_muted),
                                );
                            }
                            if let Some(image) = product.product_images_urls.first() {
                                ui.hyperlink_to("Photo", image);
                            }
                            let choice = self.variant_choice.entry(product.product_id).or_default();
                            ui.horizontal(|ui| {
                                egui::ComboBox::from_id_salt(("size", product.product_id))
                                    .selected_text(choice.0.as_deref().unwrap_or("Size"))
                                    .width(64.0)
                                    .show_ui(ui, |ui| {
                                        for size in SIZES {
                                            ui.selectable_value(
                                                &mut choice.0,
                                                Some(size.to_string()),
                                                size,
                                            );
                                        }
                                    });
                                egui::ComboBox::from_id_salt(("color", product.product_id))
                                    .selected_text(choice.1.as_deref().unwrap_or("Color"))
                                    .width(80.0)
                                    .show_ui(ui, |ui| {
                                        for color in COLORS {
                                            ui.selectable_value(
                                                &mut choice.1,
                                                Some(color.to_string()),
                                                color,
                                            );
                                        }
                                    });
                            });
                            match (&choice.0, &choice.1) {
                                (Some(size), Some(color)) => {
                                    if ui.button("Add to cart").clicked() {
                                        added =
                                            Some((product.clone(), size.clone(), color.clone()));
                                    }
                                }
                                _ => {
                                    ui.add_enabled(false, egui::Button::new("Add to cart"))
                                        .on_disabled_hover_text("Pick a size and a color");
                                }
                            }
                        });
                    }
                });
            });

        if let Some((product, size, color)) = added {
            self.log_diagnostic(format!(
                "added {} ({size}, {color}) to cart",
                product.product_name
            ));
            self.cart.add(product, 1, Some(size), Some(color));
        }
        if reload {
            self.catalog_loading = true;
            self.dispatcher.load_catalog();
        }
    }

    fn render_right_panel(&mut self, ctx: &egui::Context) {
        let mut action: Option<CartAction> = None;

        egui::SidePanel::right("cart_panel")
            .resizable(true)
            .default_width(260.0)
            .show(ctx, |ui| {
                ui.heading("Cart");
                ui.separator();
                if self.cart.is_empty() {
                    ui.label(RichText::new("Your cart is empty").color(self.theme.text_muted));
                    return;
                }

                for (index, item) in self.cart.items().iter().enumerate() {
                    ui.horizontal(|ui| {
                        ui.label(&item.product.product_name);
                        if ui.small_button("-").clicked() {
                            action = Some(CartAction::Decrement(index));
                        }
                        ui.label(item.quantity.to_string());
                        if ui.small_button("+").clicked() {
                            action = Some(CartAction::Increment(index));
                        }
                        if ui.small_button("x").clicked() {
                            action = Some(CartAction::Remove(index));
                        }
                    });
                    let variant = item.variant_label();
                    let detail = if variant.is_empty() {
                        format!("{:.2} €", item.subtotal())
                    } else {
                        format!("{variant} · {:.2} €", item.subtotal())
                    };
                    ui.label(RichText::new(detail).color(self.theme.text_muted));
                }
                ui.separator();
                let summary = OrderSummary::for_cart(&self.cart);
                Self::render_order_summary(ui, &self.theme, &summary);
                ui.horizontal(|ui| {
                    if ui.button("Checkout").clicked() {
                        action = Some(CartAction::Checkout);
                    }
                    if ui.button("Empty cart").clicked() {
                        action = Some(CartAction::Clear);
                    }
                });
            });

        if let Some(action) = action {
            self.apply_cart_action(action);
        }
    }

    fn apply_cart_action(&mut self, action: CartAction) {
        let line = |cart: &Cart, index: usize| {
            cart.items().get(index).map(|item| {
                (
                    item.product.product_id,
                    item.size.clone(),
                    item.color.clone(),
                    item.quantity,
                )
            })
        };

        match action {
            CartAction::Clear => self.cart.clear(),
            CartAction::Checkout => {
                if self.checkout_form.email.trim().is_empty() {
                    if let Some(session) = &self.session {
                        self.checkout_form.email = session.email.clone();
                    }
                }
                self.checkout_error = None;
                self.last_receipt = None;
                self.checkout_open = true;
            }
            CartAction::Increment(index) => {
                if let Some((id, size, color, quantity)) = line(&self.cart, index) {
                    self.cart.update_quantity(
                        id,
                        size.as_deref(),
                        color.as_deref(),
                        quantity.saturating_add(1),
                    );
                }
            }
            CartAction::Decrement(index) => {
                if let Some((id, size, color, quantity)) = line(&self.cart, index) {
                    self.cart.update_quantity(
                        id,
                        size.as_deref(),
                        color.as_deref(),
                        quantity.saturating_sub(1),
                    );
                }
            }
            CartAction::Remove(index) => {
                if let Some((id, size, color, _)) = line(&self.cart, index) {
                    self.cart.remove(id, size.as_deref(), color.as_deref());
                }
            }
        }
    }

    fn render_center_panel(&mut self, ctx: &egui::Context, state: &WorkflowState) {
        let logged_in = self.session.is_some();
        let mut upload_clicked = false;
        let mut retry_clicked = false;
        let mut generate_clicked = false;
        let mut reset_clicked = false;

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("AI personalization");
            ui.label(
                RichText::new(Self::status_message(state))
                    .color(self.theme.status_color(state.status)),
            );
            if let Some(error) = &self.last_error {
                ui.label(RichText::new(error).color(self.theme.danger));
            }
            ui.separator();

            match state.status {
                WorkflowStatus::Idle => {
                    ui.horizontal(|ui| {
                        ui.add_enabled(
                            logged_in,
                            egui::TextEdit::singleline(&mut self.photo_path_input)
                                .desired_width(360.0)
                                .hint_text("Path to a photo of you"),
                        );
                        upload_clicked = ui
                            .add_enabled(
                                logged_in && !self.photo_path_input.trim().is_empty(),
                                egui::Button::new("Upload"),
                            )
                            .clicked();
                    });
                    if !logged_in {
                        ui.label(
                            RichText::new("Sign in to use AI personalization")
                                .color(self.theme.text_muted),
                        );
                    }
                }
                WorkflowStatus::Uploading => {
                    ui.spinner();
                }
                WorkflowStatus::FetchingMood => {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        if self.last_error.is_some() {
                            retry_clicked = ui.button("Retry").clicked();
                        }
                    });
                }
                WorkflowStatus::ProductsReady => {
                    if let Some(query) = &state.mood_query {
                        ui.label(RichText::new(format!("Search: {query}")).small());
                    }
                    ScrollArea::vertical()
                        .id_salt("candidate_list")
                        .max_height(240.0)
                        .show(ui, |ui| {
                            for product in &state.candidate_products {
                                ui.label(format!(
                                    "{} · {:.2} €",
                                    product.product_name, product.product_price
                                ));
                            }
                        });
                    generate_clicked = ui
                        .add_enabled(
                            !state.candidate_products.is_empty(),
                            egui::Button::new("Generate my looks"),
                        )
                        .clicked();
                }
                WorkflowStatus::Generating => {
                    ui.add(
                        egui::ProgressBar::new(state.progress.fraction())
                            .text(format!(
                                "{}/{}",
                                state.progress.current, state.progress.total
                            ))
                            .animate(true),
                    );
                }
                WorkflowStatus::Completed => {
                    ScrollArea::vertical()
                        .id_salt("generated_results")
                        .max_height(300.0)
                        .show(ui, |ui| {
                            for result in &state.generated_results {
                                ui.horizontal(|ui| {
                                    ui.label(result.display_name());
                                    ui.hyperlink(&result.image_url);
                                });
                            }
                        });
                }
            }

            if state.status != WorkflowStatus::Idle {
                ui.separator();
                reset_clicked = ui
                    .add_enabled(!state.status.is_busy(), egui::Button::new("Start over"))
                    .clicked();
            }

            ui.separator();
            egui::CollapsingHeader::new("Diagnostics")
                .default_open(false)
                .show(ui, |ui| {
                    ScrollArea::vertical()
                        .id_salt("diagnostics_log")
                        .max_height(120.0)
                        .stick_to_bottom(true)
                        .show(ui, |ui| {
                            for entry in &self.diagnostics_log {
                                ui.label(entry);
                            }
                        });
                });
        });

        if upload_clicked {
            self.last_error = None;
            let path = PathBuf::from(self.photo_path_input.trim());
            self.dispatcher.upload_photo(path);
        }
        if retry_clicked {
            self.last_error = None;
            self.dispatcher.fetch_mood();
        }
        if generate_clicked {
            self.last_error = None;
            self.dispatcher.start_customization();
        }
        if reset_clicked {
            self.last_error = None;
            self.photo_path_input.clear();
            self.dispatcher.reset();
        }
    }

    fn render_order_summary(ui: &mut egui::Ui, theme: &Theme, summary: &OrderSummary) {
        ui.label(format!("Subtotal: {:.2} €", summary.subtotal));
        if summary.free_shipping() {
            ui.label("Shipping: free");
        } else {
            ui.label(format!("Shipping: {:.2} €", summary.shipping));
            ui.label(
                RichText::new("Free shipping on orders over 50 €")
                    .small()
                    .color(theme.text_muted),
            );
        }
        ui.strong(format!("Total: {:.2} €", summary.total));
    }

    fn render_checkout(&mut self, ctx: &egui::Context) {
        if !self.checkout_open {
            return;
        }
        let mut open = true;
        let mut submit = false;
        let summary = OrderSummary::for_cart(&self.cart);

        egui::Window::new("Checkout")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                if let Some(receipt) = &self.last_receipt {
                    ui.heading("Order placed");
                    ui.label(format!("Order number: #{}", receipt.order_number));
                    ui.label(format!("Total: {:.2} €", receipt.summary.total));
                    ui.label(format!("A confirmation will be sent to {}", receipt.email));
                    return;
                }

                let form = &mut self.checkout_form;
                egui::Grid::new("checkout_form")
                    .num_columns(2)
                    .show(ui, |ui| {
                        for (label, value) in [
                            ("Full name", &mut form.name),
                            ("Email", &mut form.email),
                            ("Phone", &mut form.phone),
                            ("Address", &mut form.address),
                            ("City", &mut form.city),
                            ("Postal code", &mut form.postal_code),
                        ] {
                            ui.label(format!("{label} *"));
                            ui.text_edit_singleline(value);
                            ui.end_row();
                        }
                        ui.label("Country *");
                        egui::ComboBox::from_id_salt("checkout_country")
                            .selected_text(form.country.as_str())
                            .show_ui(ui, |ui| {
                                for country in Country::ALL {
                                    ui.selectable_value(
                                        &mut form.country,
                                        country,
                                        country.as_str(),
                                    );
                                }
                            });
                        ui.end_row();
                    });

                ui.separator();
                for item in self.cart.items() {
                    ui.label(format!(
                        "{} · {:.2} € x {}",
                        item.product.product_name, item.product.product_price, item.quantity
                    ));
                }
                Self::render_order_summary(ui, &self.theme, &summary);
                if let Some(error) = &self.checkout_error {
                    ui.label(RichText::new(error).color(self.theme.danger));
                }
                submit = ui
                    .add_enabled(!self.cart.is_empty(), egui::Button::new("Confirm purchase"))
                    .clicked();
            });

        if !open {
            self.checkout_open = false;
            self.last_receipt = None;
            return;
        }
        if submit {
            match place_order(&self.checkout_form, &mut self.cart) {
                Ok(receipt) => {
                    self.log_diagnostic(format!(
                        "order #{} placed for {:.2} €",
                        receipt.order_number, receipt.summary.total
                    ));
                    self.checkout_form = CheckoutForm::default();
                    self.checkout_error = None;
                    self.last_receipt = Some(receipt);
                }
                Err(err) => self.checkout_error = Some(err.to_string()),
            }
        }
    }

    fn render_notification(&mut self, ctx: &egui::Context, state: &WorkflowState) {
        if !state.show_notification() {
            return;
        }
        let mut dismissed = false;
        egui::Window::new("AI looks")
            .anchor(egui::Align2::RIGHT_BOTTOM, [-16.0, -16.0])
            .collapsible(false)
            .resizable(false)
            .title_bar(false)
            .show(ctx, |ui| {
                ui.label(
                    RichText::new(Self::status_message(state))
                        .color(self.theme.status_color(state.status)),
                );
                if state.status == WorkflowStatus::Generating {
                    ui.add(egui::ProgressBar::new(state.progress.fraction()).show_percentage());
                }
                dismissed = ui
                    .button(RichText::new("Dismiss").color(Color32::GRAY))
                    .clicked();
            });

        if dismissed {
            self.dispatcher.dismiss_notification();
        }
    }
}

impl eframe::App for AirisApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events(ctx);
        let state = self.dispatcher.tracker().snapshot();

        self.render_top_bar(ctx, &state);
        self.render_left_panel(ctx);
        self.render_right_panel(ctx);
        self.render_center_panel(ctx, &state);
        self.render_checkout(ctx);
        self.render_notification(ctx, &state);

        if matches!(
            state.status,
            WorkflowStatus::Uploading | WorkflowStatus::FetchingMood | WorkflowStatus::Generating
        ) {
            ctx.request_repaint_after(BUSY_REPAINT);
        }
    }
}
