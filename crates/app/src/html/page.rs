/// Leaflet page that forwards pointer events to `POST /events` and applies
/// the render commands it gets back.
pub const MAP_INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Cambridge Carbon Map</title>
  <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" />
  <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
  <style>
    html, body { margin: 0; height: 100%; font-family: sans-serif; }
    .map { position: absolute; inset: 0; }
    .dashboard { max-width: 440px; }
    .dashboard .headline { font-weight: bold; margin: 0 0 6px; }
    .dashboard .gauges { display: flex; flex-wrap: wrap; }
    .entity-name { font-weight: bold; }
  </style>
</head>
<body>
  <div id="mapRoot"></div>
  <script>
    "use strict";

    const layers = new Map();
    let map = null;
    let popup = null;

    // Requests go out one at a time so the server sees events in page order.
    let queue = Promise.resolve();
    let seq = 0;
    let pendingMove = null;

    function enqueue(request) {
      queue = queue
        .then(request)
        .then((response) => (response.ok ? response.json() : []))
        .then(apply)
        .catch((err) => console.warn("request failed", err));
      return queue;
    }

    function send(kind, entity, latlng) {
      seq += 1;
      const lat = latlng ? latlng.lat : 0;
      const lng = latlng ? latlng.lng : 0;
      const body = { seq, kind, entity, lat, lng };
      return fetch("/events", {
        method: "POST",
        headers: { "Content-Type": "application/json" },
        body: JSON.stringify(body),
      });
    }

    function post(kind, entity, latlng) {
      return enqueue(() => send(kind, entity, latlng));
    }

    // Only the latest position of a waiting move is sent.
    function move(entity, latlng) {
      if (pendingMove && pendingMove.entity === entity) {
        pendingMove.latlng = latlng;
        return;
      }
      const waiting = { entity, latlng };
      pendingMove = waiting;
      enqueue(() => {
        if (pendingMove === waiting) pendingMove = null;
        return send("pointer_move", waiting.entity, waiting.latlng);
      });
    }

    function style(paint) {
      return {
        fillColor: paint.fillColor,
        fillOpacity: paint.fillOpacity,
        color: paint.color,
        opacity: paint.opacity,
      };
    }

    // Fully transparent layers let the pointer through to whatever is below.
    function setInteractive(layer, paint) {
      const hidden = paint.fillOpacity === 0 && paint.opacity === 0;
      layer.eachLayer((part) => {
        const element = part.getElement && part.getElement();
        if (element) {
          element.style.pointerEvents = hidden ? "none" : "";
        }
      });
    }

    function addLayer(command) {
      const entity = command.entity;
      const layer = L.geoJSON(command.geometry, { style: () => style(command.paint) });
      layer.on("mouseover", (e) => post("hover_enter", entity, e.latlng));
      layer.on("mouseout", (e) => post("hover_leave", entity, e.latlng));
      layer.on("mousemove", (e) => move(entity, e.latlng));
      layer.on("click", (e) => {
        L.DomEvent.stopPropagation(e);
        post("click", entity, e.latlng);
      });
      layer.addTo(map);
      setInteractive(layer, command.paint);
      layers.set(command.layer, layer);
    }

    function apply(commands) {
      for (const command of commands) {
        const layer = layers.get(command.layer);
        switch (command.op) {
          case "add_layer":
            addLayer(command);
            break;
          case "set_paint":
            if (layer) {
              layer.setStyle(style(command.paint));
              setInteractive(layer, command.paint);
            }
            break;
          case "bring_to_front":
            if (layer) layer.bringToFront();
            break;
          case "open_popup":
            popup = L.popup({ autoPan: false, keepInView: true, maxWidth: 800 })
              .setLatLng(command.at)
              .setContent(command.html)
              .openOn(map);
            break;
          case "move_popup":
            if (popup) popup.setLatLng(command.at);
            break;
          case "close_popup":
            map.closePopup();
            popup = null;
            break;
        }
      }
    }

    function poll() {
      enqueue(() => fetch("/commands")).finally(() => setTimeout(poll, 500));
    }

    fetch("/config")
      .then((response) => response.json())
      .then((config) => {
        const root = document.getElementById("mapRoot");
        root.id = config.container;
        root.className = "map";
        map = L.map(config.container).setView([config.center.lat, config.center.lng], config.zoom);
        L.tileLayer(config.tileUrl, { attribution: config.attribution }).addTo(map);
        map.on("click", (e) => post("map_click", null, e.latlng));
        return fetch("/snapshot");
      })
      .then((response) => response.json())
      .then(apply)
      .then(poll);
  </script>
</body>
</html>
"##;
